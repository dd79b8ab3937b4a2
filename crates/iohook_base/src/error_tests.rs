/* 📖 # Why use a separate file for these error tests?

These tests install a tracing subscriber with an ErrorLayer and check the
Debug tree, which includes span traces. Keeping them apart from error.rs keeps
the subscriber setup out of the plain unit tests.
*/

#[cfg(test)]
mod tests {
    use crate::error::ErrorKind;
    use crate::{HookError, HookResult, ResultExt};
    use expect_test::expect;
    use std::error::Error;
    use std::io;
    use std::path::PathBuf;
    use tracing::span;
    use tracing::warn_span;
    use tracing_error::ErrorLayer;
    use tracing_subscriber::layer::SubscriberExt;
    use tracing_subscriber::util::SubscriberInitExt;

    /// Set up tracing with ErrorLayer for tests.
    /// Uses `try_init()` to handle multiple tests running concurrently.
    fn setup_tracing_subscriber() {
        let _ = tracing_subscriber::registry()
            .with(ErrorLayer::default())
            .try_init();
    }

    #[test]
    fn test_error_from_file_error() {
        let io_err = io::Error::new(io::ErrorKind::NotFound, "file not found");
        let path = PathBuf::from("cmu_us_kal.flitevox");
        let error = HookError::new(ErrorKind::FileError {
            path: path.clone(),
            source: io_err,
        });

        match error.kind() {
            ErrorKind::FileError { path: p, .. } => {
                assert_eq!(p, &path);
            }
            _ => panic!("Expected FileError variant"),
        }
    }

    #[test]
    fn test_error_context_attachment() {
        let error = HookError::message("original error")
            .context("first context")
            .context("second context");

        assert_eq!(error.get_context().len(), 2);
        assert_eq!(error.get_context()[0], "first context");
        assert_eq!(error.get_context()[1], "second context");
    }

    #[test]
    fn test_error_with_context_lazy_evaluation() {
        let mut called = false;
        let error = HookError::message("error").with_context(|| {
            called = true;
            "lazy context".to_string()
        });

        assert!(called);
        assert_eq!(error.get_context()[0], "lazy context");
    }

    #[test]
    fn test_error_display_with_multiple_contexts() {
        let error = HookError::message("root error")
            .context("first")
            .context("second")
            .context("third");
        assert_eq!(error.to_string(), "first: second: third: root error");
    }

    #[test]
    fn test_error_display_file_error() {
        let io_err = io::Error::new(io::ErrorKind::NotFound, "not found");
        let error = HookError::new(ErrorKind::FileError {
            path: PathBuf::from("/tmp/iohook.toml"),
            source: io_err,
        });
        let display = error.to_string();
        assert!(display.contains("/tmp/iohook.toml"));
        assert!(display.contains("not found"));
    }

    #[test]
    fn test_error_source_message() {
        let error = HookError::message("test");
        assert!(error.source().is_none());
    }

    #[test]
    fn test_result_ext_chaining() {
        let result: HookResult<i32> = Err(Box::new(HookError::message("root")));
        let final_result = result
            .context("step 1")
            .context("step 2")
            .with_context(|| "step 3".to_string());
        let err = final_result.unwrap_err();
        assert_eq!(err.to_string(), "step 1: step 2: step 3: root");
    }

    #[test]
    fn test_result_ext_context_success() {
        let result: HookResult<i32> = Ok(42);
        assert_eq!(result.context("operation failed").unwrap(), 42);
    }

    #[test]
    fn test_debug_without_span() {
        let error = HookError::new(ErrorKind::InvalidOpenMode { bits: 0 })
            .context("opening voice file")
            .context("loading voice");

        expect![[r#"
            Invalid open mode 0x0: expected a combination of read, write and append
            ├─ opening voice file
            └─ loading voice
        "#]]
        .assert_eq(&format!("{:?}", error));
    }

    #[test]
    fn test_debug_nested_errors() {
        let inner_error = HookError::message("inner error").context("inner context");
        let outer_error = HookError::message("outer error")
            .context("outer context")
            .caused_by(inner_error);

        expect![[r#"
            outer error
            ├─ outer context
            └─ cause: inner error
               └─ inner context
        "#]]
        .assert_eq(&format!("{:?}", outer_error));
    }

    #[test]
    fn test_debug_multiple_nested_errors() {
        let error_1 = HookError::message("error 1").context("context 1");
        let error_2 = HookError::message("error 2")
            .context("context 2")
            .caused_by(error_1);
        let error_3 = HookError::message("error 3")
            .context("context 3")
            .caused_by(error_2);

        expect![[r#"
            error 3
            ├─ context 3
            └─ cause: error 2
               ├─ context 2
               └─ cause: error 1
                  └─ context 1
        "#]]
        .assert_eq(&format!("{:?}", error_3));
    }

    #[test]
    fn test_spantrace_is_rendered_when_captured() {
        setup_tracing_subscriber();

        let operation_span = span!(tracing::Level::DEBUG, "open_voice", slot = "open");
        let _guard = operation_span.enter();
        let outer_span = warn_span!("resolve_mode");
        let _outer_guard = outer_span.enter();

        let error = HookError::new(ErrorKind::InvalidOpenMode { bits: 8 });
        let debug = format!("{:?}", error);

        assert!(debug.starts_with("Invalid open mode 0x8"));
        assert!(debug.contains("Trace:"));
        assert!(debug.contains("open_voice"));
        assert!(debug.contains("resolve_mode"));
        assert!(debug.contains("slot=\"open\"") || debug.contains("slot=open"));
    }
}
