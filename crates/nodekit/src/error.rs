use std::sync::RwLock;

/// Process-wide hook invoked on fatal errors.
///
/// The arguments are the formatted message, the source file and the line the
/// error was raised from. The default handler panics with all three. A
/// replacement may log or abort instead; if it returns, the kernel still
/// panics, since no operation can continue past a fatal error.
pub type ErrorHandler = fn(message: &str, file: &str, line: u32);

fn default_handler(message: &str, file: &str, line: u32) {
    panic!("[{file}:{line}] {message}");
}

static HANDLER: RwLock<ErrorHandler> = RwLock::new(default_handler);

/// Installs a replacement error handler.
///
/// Intended to be called once at process start. Installation itself is not
/// synchronized with concurrent fatal errors.
pub fn set_error_handler(handler: ErrorHandler) {
    *HANDLER.write().unwrap() = handler;
}

/// Restores the default panicking handler.
pub fn reset_error_handler() {
    *HANDLER.write().unwrap() = default_handler;
}

pub fn error_handler() -> ErrorHandler {
    *HANDLER.read().unwrap()
}

#[doc(hidden)]
pub fn handle_fatal(message: &str, file: &str, line: u32) -> ! {
    (error_handler())(message, file, line);
    panic!("[{file}:{line}] {message}");
}

/// Routes a formatted fatal error through the installed handler.
#[macro_export]
macro_rules! fatal {
    ($($arg:tt)*) => {
        $crate::error::handle_fatal(&format!($($arg)*), file!(), line!())
    };
}
