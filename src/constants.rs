//! Shared constants for prompts, layout and provisioning
//!

/// The art-style prompt sent with every generation request.
pub const DEFAULT_PROMPT: &str = "close up of a panda head with a funny human man face, smug expression, trolling face, meme style, simple black and white line art, vector art, flat color, white background, looking at viewer";

/// Attributes we ask the model to stay away from.
pub const DEFAULT_NEGATIVE_PROMPT: &str = "body, paws, claws, realistic fur, 3d, shading, gradient, grey, fuzzy, blurry, realistic, photo, cute, animal face, sleeping, lying down";

/// Hosted model used unless configured otherwise.
pub const DEFAULT_MODEL: &str = "stabilityai/stable-diffusion-xl-base-1.0";

/// Caption shown in the form on first load.
pub const DEFAULT_CAPTION: &str = "大家不要出聲\n讓他一個人尷尬";

/// Raw inference API base, models are appended as `/{owner}/{name}`.
pub const HF_INFERENCE_API_BASE: &str = "https://api-inference.huggingface.co/models";

/// Router base used by the hosted SDK clients.
pub const HF_ROUTER_API_BASE: &str = "https://router.huggingface.co/hf-inference/models";

/// Where the caption font lives once provisioned.
pub const DEFAULT_FONT_PATH: &str = "NotoSansTC-Bold.otf";

/// Upstream location of the caption font.
pub const DEFAULT_FONT_URL: &str =
    "https://github.com/googlefonts/noto-cjk/raw/main/Sans/OTF/TraditionalChinese/NotoSansCJKtc-Bold.otf";

/// Wait hint used when a loading error carries no `estimated_time`.
pub const DEFAULT_RETRY_AFTER_SECONDS: f64 = 20.0;

/// Wrap width in characters, not pixels.
pub const WRAP_WIDTH: usize = 10;

/// Font size is the image width divided by this.
pub const FONT_SIZE_DIVISOR: u32 = 10;

/// Gap above the first line and between lines.
pub const LINE_SPACING: u32 = 10;

/// Extra padding added to the caption band.
pub const BAND_PADDING: u32 = 20;

/// Contrast multiplier applied before compositing.
pub const CONTRAST_FACTOR: f32 = 2.0;

/// Brightness multiplier applied after contrast.
pub const BRIGHTNESS_FACTOR: f32 = 1.1;

/// Generated images are scaled to this square size before captioning.
pub const DEFAULT_RESIZE: u32 = 512;
