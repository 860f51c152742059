use std::any::Any;
use std::panic::{catch_unwind, AssertUnwindSafe};

/// Message extracted from a caught panic payload.
#[derive(Debug, Clone)]
pub struct PanicInfo {
    pub message: String,
}

impl PanicInfo {
    pub(crate) fn from_payload(payload: Box<dyn Any + Send>) -> Self {
        let message = if let Some(s) = payload.downcast_ref::<&str>() {
            s.to_string()
        } else if let Some(s) = payload.downcast_ref::<String>() {
            s.clone()
        } else {
            "Unknown panic".to_string()
        };

        Self { message }
    }
}

/// Run `f`, turning an unwinding panic into a [`PanicInfo`].
pub fn catch_panic<F, R>(f: F) -> Result<R, PanicInfo>
where
    F: FnOnce() -> R,
{
    catch_unwind(AssertUnwindSafe(f)).map_err(PanicInfo::from_payload)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_catch_panic_str() {
        let result: Result<(), _> = catch_panic(|| panic!("test panic"));
        assert_eq!(result.unwrap_err().message, "test panic");
    }

    #[test]
    fn test_catch_panic_formatted() {
        let n = 3;
        let result: Result<(), _> = catch_panic(|| panic!("bad value {}", n));
        assert_eq!(result.unwrap_err().message, "bad value 3");
    }

    #[test]
    fn test_catch_panic_success() {
        assert_eq!(catch_panic(|| 42).unwrap(), 42);
    }
}
