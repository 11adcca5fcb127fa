use std::sync::LazyLock;

use axum::response::Html;
use tera::{Context, Tera};

use crate::{dto::UserView, errors::ApiError};

// Templates are compiled into the binary so the server has no runtime
// dependency on the working directory.
static TEMPLATES: LazyLock<Tera> = LazyLock::new(|| {
    let mut tera = Tera::default();
    tera.add_raw_templates(vec![
        ("base.html", include_str!("../templates/base.html")),
        (
            "includes/paginator.html",
            include_str!("../templates/includes/paginator.html"),
        ),
        (
            "includes/post_card.html",
            include_str!("../templates/includes/post_card.html"),
        ),
        (
            "includes/form_errors.html",
            include_str!("../templates/includes/form_errors.html"),
        ),
        ("blog/index.html", include_str!("../templates/blog/index.html")),
        ("blog/detail.html", include_str!("../templates/blog/detail.html")),
        ("blog/create.html", include_str!("../templates/blog/create.html")),
        ("blog/category.html", include_str!("../templates/blog/category.html")),
        ("blog/profile.html", include_str!("../templates/blog/profile.html")),
        ("blog/user.html", include_str!("../templates/blog/user.html")),
        ("blog/comment.html", include_str!("../templates/blog/comment.html")),
        (
            "registration/registration_form.html",
            include_str!("../templates/registration/registration_form.html"),
        ),
        (
            "registration/login.html",
            include_str!("../templates/registration/login.html"),
        ),
        (
            "registration/logged_out.html",
            include_str!("../templates/registration/logged_out.html"),
        ),
        ("pages/about.html", include_str!("../templates/pages/about.html")),
        ("pages/rules.html", include_str!("../templates/pages/rules.html")),
        ("pages/404.html", include_str!("../templates/pages/404.html")),
        ("pages/500.html", include_str!("../templates/pages/500.html")),
    ])
    .expect("embedded templates must parse");
    tera
});

/// Starts a template context with the signed-in user, if any.
pub fn context(user: Option<&UserView>) -> Context {
    let mut ctx = Context::new();
    ctx.insert("user", &user);
    ctx
}

pub fn render(template: &str, ctx: &Context) -> Result<Html<String>, ApiError> {
    Ok(Html(TEMPLATES.render(template, ctx)?))
}

/// Renders a template that needs no data beyond an anonymous user.
pub fn render_plain(template: &str) -> tera::Result<String> {
    TEMPLATES.render(template, &context(None))
}
