//! The §6 exit-code contract: `0` success, `2` invalid configuration,
//! `3` unresolved dependency or cycle, `4` provider unreachable, `5`
//! conflicting concurrent workflow. Anything else this CLI can fail
//! with (not-found, integrity, timeout, cancellation) falls back to
//! `1`, a generic failure distinct from the five contractual codes.

use computor_core::error::{ComputorError, ErrorKind};

pub fn exit_code_for(err: &ComputorError) -> i32 {
    match err.kind() {
        ErrorKind::Validation => 2,
        ErrorKind::DependencyCycle | ErrorKind::NoMatchingVersion | ErrorKind::UnknownSlug | ErrorKind::UnknownTag => 3,
        ErrorKind::ProviderTransient | ErrorKind::ProviderAuth => 4,
        ErrorKind::Conflict => 5,
        ErrorKind::NotFound | ErrorKind::Integrity | ErrorKind::TimeoutExceeded | ErrorKind::CancelRequested => 1,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn maps_the_five_contractual_codes() {
        assert_eq!(exit_code_for(&ComputorError::Validation("x".into())), 2);
        assert_eq!(exit_code_for(&ComputorError::DependencyCycle("x".into())), 3);
        assert_eq!(exit_code_for(&ComputorError::NoMatchingVersion("x".into())), 3);
        assert_eq!(exit_code_for(&ComputorError::ProviderTransient("x".into())), 4);
        assert_eq!(exit_code_for(&ComputorError::ProviderAuth("x".into())), 4);
        assert_eq!(exit_code_for(&ComputorError::Conflict("x".into())), 5);
        assert_eq!(exit_code_for(&ComputorError::NotFound("x".into())), 1);
    }
}
