use askama::Template;
use askama_web::WebTemplate;
use base64::Engine;
use base64::engine::general_purpose;
use serde::Deserialize;

use crate::constants::DEFAULT_CAPTION;

#[derive(Deserialize, Debug)]
pub(crate) struct CaptionForm {
    #[serde(default)]
    pub(crate) caption: String,
}

impl CaptionForm {
    /// The caption with browser `\r\n` line breaks turned into `\n`.
    pub(crate) fn caption(&self) -> String {
        self.caption.replace("\r\n", "\n")
    }
}

#[derive(Template, WebTemplate)]
#[template(path = "home.html")]
pub(crate) struct HomeTemplate {
    pub(crate) caption: String,
    pub(crate) model: String,
    pub(crate) has_warning: bool,
    pub(crate) warning: String,
    pub(crate) has_error: bool,
    pub(crate) error_message: String,
    pub(crate) has_image: bool,
    pub(crate) image_data: String,
}

impl HomeTemplate {
    pub(crate) fn new(caption: &str, model: &str) -> Self {
        Self {
            caption: caption.to_string(),
            model: model.to_string(),
            has_warning: false,
            warning: String::new(),
            has_error: false,
            error_message: String::new(),
            has_image: false,
            image_data: String::new(),
        }
    }

    pub(crate) fn with_default_caption(model: &str) -> Self {
        Self::new(DEFAULT_CAPTION, model)
    }

    pub(crate) fn warn(&mut self, message: &str) {
        self.has_warning = true;
        self.warning = message.to_string();
    }

    pub(crate) fn fail(&mut self, message: String) {
        self.has_error = true;
        self.error_message = message;
    }

    pub(crate) fn show_png(&mut self, png: &[u8]) {
        self.has_image = true;
        self.image_data = general_purpose::STANDARD.encode(png);
    }
}
