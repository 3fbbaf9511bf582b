use serde::Deserialize;
use validator::Validate;

pub const REQUIRED: &str = "This field is required.";

#[derive(Debug, Default, Validate, Deserialize)]
#[serde(default)]
pub struct SignupForm {
    #[validate(length(min = 1, code = "required", message = "This field is required."))]
    pub username: String,
    #[validate(
        length(min = 1, code = "required", message = "This field is required."),
        email(message = "Enter a valid email address.")
    )]
    pub email: String,
    #[validate(length(min = 1, code = "required", message = "This field is required."))]
    pub password1: String,
    #[validate(length(min = 1, code = "required", message = "This field is required."))]
    pub password2: String,
}

#[derive(Debug, Default, Validate, Deserialize)]
#[serde(default)]
pub struct LoginForm {
    #[validate(length(min = 1, code = "required", message = "This field is required."))]
    pub username: String,
    #[validate(length(min = 1, code = "required", message = "This field is required."))]
    pub password: String,
}

/// Post body. The length ceiling is configurable, so it is checked by the
/// content service rather than here.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct PostForm {
    pub content: String,
}
