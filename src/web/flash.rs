//! One-shot status messages carried across the post/redirect/get cycle.
//!
//! Mutations redirect to `/?msg=<kind>:<text>`; the index page decodes the
//! parameter and shows a dismissible alert.

/// Alert category.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlashKind {
    Success,
    Error,
    Info,
}

impl FlashKind {
    fn as_str(self) -> &'static str {
        match self {
            FlashKind::Success => "success",
            FlashKind::Error => "error",
            FlashKind::Info => "info",
        }
    }

    /// Bootstrap alert class suffix.
    pub fn alert_class(self) -> &'static str {
        match self {
            FlashKind::Success => "success",
            FlashKind::Error => "danger",
            FlashKind::Info => "info",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Flash {
    pub kind: FlashKind,
    pub text: String,
}

impl Flash {
    pub fn success(text: impl Into<String>) -> Self {
        Self {
            kind: FlashKind::Success,
            text: text.into(),
        }
    }

    pub fn error(text: impl Into<String>) -> Self {
        Self {
            kind: FlashKind::Error,
            text: text.into(),
        }
    }

    pub fn info(text: impl Into<String>) -> Self {
        Self {
            kind: FlashKind::Info,
            text: text.into(),
        }
    }

    /// Index URL that displays this message.
    pub fn redirect_target(&self) -> String {
        let msg = format!("{}:{}", self.kind.as_str(), self.text);
        format!("/?msg={}", urlencoding::encode(&msg))
    }

    /// Decode an already URL-decoded `msg` query value. Unknown prefixes
    /// are shown as info.
    pub fn parse(msg: &str) -> Option<Self> {
        if msg.trim().is_empty() {
            return None;
        }
        let flash = match msg.split_once(':') {
            Some(("success", text)) => Flash::success(text),
            Some(("error", text)) => Flash::error(text),
            Some(("info", text)) => Flash::info(text),
            _ => Flash::info(msg),
        };
        Some(flash)
    }
}
