/// Per-call request context.
///
/// Compilation reads the active locale from here, never from process state,
/// so concurrent requests with different locales compile independently.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Context {
    locale: Option<String>,
}

impl Context {
    pub fn new() -> Context {
        Context::default()
    }

    pub fn locale(mut self, locale: impl Into<String>) -> Context {
        self.locale = Some(locale.into());
        self
    }

    pub fn get_locale(&self) -> Option<&str> {
        self.locale.as_deref()
    }

    /// The locale in effect, falling back to `default`.
    pub(crate) fn effective_locale<'a>(&'a self, default: Option<&'a str>) -> Option<&'a str> {
        self.locale.as_deref().or(default)
    }
}
