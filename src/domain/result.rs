//! Result type alias for railpos

use super::errors::RailposError;

/// Result type alias for railpos operations
///
/// # Examples
///
/// ```
/// use railpos::domain::result::Result;
/// use railpos::domain::errors::RailposError;
///
/// fn failing_function() -> Result<()> {
///     Err(RailposError::Configuration("missing feed.url".to_string()))
/// }
///
/// assert!(failing_function().is_err());
/// ```
pub type Result<T> = std::result::Result<T, RailposError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_result_with_question_mark() -> Result<()> {
        fn inner() -> Result<i32> {
            Ok(42)
        }

        let value = inner()?;
        assert_eq!(value, 42);
        Ok(())
    }
}
