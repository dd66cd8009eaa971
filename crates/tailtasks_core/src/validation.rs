//! Form input validation for todos and dogs.
//!
//! # Responsibility
//! - Reject blank required fields before anything reaches the store.
//! - Reject free text outside a conservative character allow-list.
//!
//! # Invariants
//! - Pure: the same input always yields the same verdict.
//! - Allowed: letters and digits of any script, space/tab/newline/carriage
//!   return, and ``. , ! ? ' " : ( ) - _ / & @ # % + * ` ``.
//! - Rejected even when every character is allowed: the SQL comment openers
//!   `--` and `/*`.

use once_cell::sync::Lazy;
use regex::Regex;
use std::error::Error;
use std::fmt::{Display, Formatter};

static ALLOWED_TEXT_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"^[\p{L}\p{N}\p{M} \t\r\n.,!?'":()\-_/&@#%+*`]*$"#).expect("valid allow-list regex")
});
static COMMENT_OPENER_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"--|/\*").expect("valid comment opener regex"));

/// Field-level rejection reason.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// Required field is empty or whitespace only.
    Blank(&'static str),
    /// Field contains characters or sequences outside the allow-list.
    Unsafe(&'static str),
    /// Record must already be persisted for this command.
    MissingId(&'static str),
}

impl ValidationError {
    /// Name of the offending field.
    pub fn field(&self) -> &'static str {
        match self {
            Self::Blank(field) | Self::Unsafe(field) | Self::MissingId(field) => field,
        }
    }
}

impl Display for ValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Blank(field) => write!(f, "{field} must not be blank"),
            Self::Unsafe(field) => write!(f, "{field} contains unsupported characters"),
            Self::MissingId(record) => write!(f, "{record} has not been saved yet"),
        }
    }
}

impl Error for ValidationError {}

/// Returns whether `value` passes the injection-safety allow-list.
pub fn is_input_safe(value: &str) -> bool {
    ALLOWED_TEXT_RE.is_match(value) && !COMMENT_OPENER_RE.is_match(value)
}

/// Boolean form used by the dog form: name and breed required, notes optional.
pub fn validate_dog_input(name: &str, breed: &str, notes: &str) -> bool {
    check_dog_input(name, breed, notes).is_ok()
}

/// Typed form of [`validate_dog_input`] naming the first offending field.
pub fn check_dog_input(name: &str, breed: &str, notes: &str) -> Result<(), ValidationError> {
    required_safe("name", name)?;
    required_safe("breed", breed)?;
    optional_safe("notes", notes)
}

/// Boolean form used by the todo form: title required, description optional.
pub fn validate_todo_input(title: &str, description: &str) -> bool {
    check_todo_input(title, description).is_ok()
}

/// Typed form of [`validate_todo_input`] naming the first offending field.
pub fn check_todo_input(title: &str, description: &str) -> Result<(), ValidationError> {
    required_safe("title", title)?;
    optional_safe("description", description)
}

/// Validates a tag title before it is created.
pub fn check_tag_title(title: &str) -> Result<(), ValidationError> {
    required_safe("tag title", title)
}

fn required_safe(field: &'static str, value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        return Err(ValidationError::Blank(field));
    }
    optional_safe(field, value)
}

fn optional_safe(field: &'static str, value: &str) -> Result<(), ValidationError> {
    if is_input_safe(value) {
        Ok(())
    } else {
        Err(ValidationError::Unsafe(field))
    }
}

#[cfg(test)]
mod tests {
    use super::{
        check_dog_input, check_todo_input, is_input_safe, validate_dog_input,
        validate_todo_input, ValidationError,
    };

    #[test]
    fn dog_input_requires_name_and_breed() {
        assert!(!validate_dog_input("", "Lab", "notes"));
        assert!(!validate_dog_input("Rex", "   ", "notes"));
        assert!(validate_dog_input("Rex", "Lab", "notes"));
        assert!(validate_dog_input("Rex", "Lab", ""));
    }

    #[test]
    fn typed_check_names_the_first_failing_field() {
        assert_eq!(
            check_dog_input("Rex", "", "x"),
            Err(ValidationError::Blank("breed"))
        );
        assert_eq!(
            check_dog_input("Rex", "Lab", "x; DROP TABLE dogs"),
            Err(ValidationError::Unsafe("notes"))
        );
        assert_eq!(
            check_todo_input(" ", "desc"),
            Err(ValidationError::Blank("title"))
        );
    }

    #[test]
    fn allow_list_accepts_everyday_text() {
        assert!(is_input_safe("O'Malley's walk, 5pm (park) - bring ball!"));
        assert!(is_input_safe("Füße waschen\nund kämmen"));
        assert!(is_input_safe("散歩 #2 @ 10:30 / 50% done"));
        assert!(is_input_safe(""));
    }

    #[test]
    fn allow_list_rejects_injection_shapes() {
        assert!(!is_input_safe("Rex'; DROP TABLE dogs;"));
        assert!(!is_input_safe("name -- comment"));
        assert!(!is_input_safe("a /* b */"));
        assert!(!is_input_safe("1=1"));
        assert!(!is_input_safe("tab\u{0007}bell"));
        assert!(!is_input_safe("back\\slash"));
        assert!(!is_input_safe("<script>"));
    }

    #[test]
    fn todo_input_validates_title_and_description() {
        assert!(validate_todo_input("Buy food", ""));
        assert!(!validate_todo_input("Buy food", "x' OR '1'='1"));
    }

    #[test]
    fn verdict_is_deterministic() {
        for _ in 0..3 {
            assert!(validate_dog_input("Rex", "Lab", "notes"));
            assert!(!validate_dog_input("", "Lab", "notes"));
        }
    }
}
