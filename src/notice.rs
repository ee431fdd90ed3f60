use std::fmt::Display;

/// A one-shot message for the user, shown as an alert by the front end.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
  pub title: &'static str,
  pub message: &'static str,
}

impl Notice {
  #[must_use]
  pub const fn new(title: &'static str, message: &'static str) -> Self {
    Self { title, message }
  }
}

impl Display for Notice {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    write!(f, "{}: {}", self.title, self.message)
  }
}
