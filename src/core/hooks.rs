//! Uncaught-error hooks
//!
//! Two integration points, both wrap-and-chain: the new handler logs the
//! failure at error severity and then calls whatever handler was installed
//! before it, so the default behavior (panic message on stderr, process
//! abort or thread unwind) is untouched.
//!
//! - the process panic hook (`std::panic::set_hook`), installed at most once
//!   per process
//! - an optional [`HookChain`] owned by an interactive host, such as a REPL
//!   that displays tracebacks instead of dying

use super::caller::{SourceLocation, UNKNOWN_FUNCTION};
use super::controller::BootstrapController;
use parking_lot::{Mutex, RwLock};
use std::any::Any;
use std::backtrace::Backtrace;
use std::fmt::Write;
use std::panic::PanicHookInfo;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

pub(crate) const SOURCE_FILE: &str = file!();

/// Tag used when wrapping an interactive host's traceback chain
pub const TRACEBACK_HOOK_TAG: &str = "bootlog";

static PANIC_HOOK_INSTALLED: AtomicBool = AtomicBool::new(false);

/// What went wrong, in a form both hooks can log
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorReport {
    pub message: String,
    pub location: Option<SourceLocation>,
    /// Set for panics: the thread that panicked
    pub thread: Option<String>,
    /// Source chain of an error, outermost first
    pub causes: Vec<String>,
    pub backtrace: Option<String>,
}

impl ErrorReport {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            location: None,
            thread: None,
            causes: Vec::new(),
            backtrace: None,
        }
    }

    #[must_use]
    pub fn with_location(mut self, location: SourceLocation) -> Self {
        self.location = Some(location);
        self
    }

    #[must_use]
    pub fn with_backtrace(mut self, backtrace: impl Into<String>) -> Self {
        self.backtrace = Some(backtrace.into());
        self
    }

    /// Capture a panic, including a forced backtrace
    pub fn from_panic(info: &PanicHookInfo<'_>) -> Self {
        let message = panic_message(info.payload());

        let mut report = Self::new(message).with_backtrace(Backtrace::force_capture().to_string());
        report.location = info
            .location()
            .map(|l| SourceLocation::new(l.file(), l.line(), UNKNOWN_FUNCTION));
        report.thread = Some(
            std::thread::current()
                .name()
                .unwrap_or("<unnamed>")
                .to_string(),
        );
        report
    }

    /// Describe an error and its `source()` chain
    pub fn from_error(error: &(dyn std::error::Error + 'static)) -> Self {
        let mut report = Self::new(error.to_string());
        let mut source = error.source();
        while let Some(cause) = source {
            report.causes.push(cause.to_string());
            source = cause.source();
        }
        report
    }

    /// Multi-line text attached to the logged record
    pub fn traceback(&self) -> String {
        let mut out = String::new();
        // writes into a String cannot fail
        match (&self.thread, &self.location) {
            (Some(thread), Some(location)) => {
                let _ = writeln!(out, "thread '{}' panicked at {}:{}:", thread, location.file, location.line);
            }
            (Some(thread), None) => {
                let _ = writeln!(out, "thread '{}' panicked:", thread);
            }
            (None, Some(location)) => {
                let _ = writeln!(out, "at {}:{}:", location.file, location.line);
            }
            (None, None) => {}
        }
        out.push_str(&self.message);
        for (idx, cause) in self.causes.iter().enumerate() {
            let _ = write!(out, "\n  caused by ({}): {}", idx, cause);
        }
        if let Some(ref backtrace) = self.backtrace {
            out.push_str("\nstack backtrace:\n");
            out.push_str(backtrace.trim_end());
        }
        out
    }
}

/// Text of a panic payload, for `panic!` with a literal or a format string
pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "Box<dyn Any>".to_string()
    }
}

pub type Hook<A> = Arc<dyn Fn(&A) + Send + Sync>;

/// Ordered chain of handlers, each able to call the one installed before it
///
/// # Example
///
/// ```
/// use bootlog::HookChain;
/// use std::sync::atomic::{AtomicUsize, Ordering};
/// use std::sync::Arc;
///
/// let shown = Arc::new(AtomicUsize::new(0));
/// let shown_clone = Arc::clone(&shown);
/// let chain = HookChain::new(move |_: &String| {
///     shown_clone.fetch_add(1, Ordering::SeqCst);
/// });
///
/// assert!(chain.wrap("audit", |msg, next| next(msg)));
/// assert!(!chain.wrap("audit", |msg, next| next(msg)));
///
/// chain.call(&"boom".to_string());
/// assert_eq!(shown.load(Ordering::SeqCst), 1);
/// ```
pub struct HookChain<A> {
    head: RwLock<Hook<A>>,
    layers: Mutex<Vec<&'static str>>,
}

impl<A: 'static> HookChain<A> {
    /// Chain whose innermost handler is `original`
    pub fn new<F>(original: F) -> Self
    where
        F: Fn(&A) + Send + Sync + 'static,
    {
        Self {
            head: RwLock::new(Arc::new(original)),
            layers: Mutex::new(Vec::new()),
        }
    }

    /// Put `layer` in front of the current head
    ///
    /// The layer receives the argument and the previous head. Returns false
    /// without changing anything if a layer with `tag` is already installed.
    pub fn wrap<F>(&self, tag: &'static str, layer: F) -> bool
    where
        F: Fn(&A, &dyn Fn(&A)) + Send + Sync + 'static,
    {
        let mut layers = self.layers.lock();
        if layers.contains(&tag) {
            return false;
        }
        let mut head = self.head.write();
        let next = Arc::clone(&head);
        *head = Arc::new(move |arg: &A| layer(arg, &*next));
        layers.push(tag);
        true
    }

    /// Run the chain from the outermost layer
    pub fn call(&self, arg: &A) {
        let head = Arc::clone(&self.head.read());
        head(arg);
    }

    pub fn is_wrapped_by(&self, tag: &str) -> bool {
        self.layers.lock().contains(&tag)
    }

    /// Number of layers above the original handler
    pub fn depth(&self) -> usize {
        self.layers.lock().len()
    }
}

/// Log panics through `controller`, then run the previous panic hook
///
/// Returns false if this process already has the hook installed.
pub fn install_panic_hook(controller: &Arc<BootstrapController>) -> bool {
    if PANIC_HOOK_INSTALLED.swap(true, Ordering::SeqCst) {
        return false;
    }
    let original = std::panic::take_hook();
    let controller = Arc::downgrade(controller);
    std::panic::set_hook(Box::new(move |info| {
        if let Some(controller) = controller.upgrade() {
            controller.log_uncaught(&ErrorReport::from_panic(info));
        }
        original(info);
    }));
    true
}

/// Whether a panic hook from this crate is active in the process
pub fn panic_hook_installed() -> bool {
    PANIC_HOOK_INSTALLED.load(Ordering::SeqCst)
}

/// Log reports passing through an interactive host's traceback chain
///
/// Returns false if the chain already carries this crate's layer.
pub fn install_traceback_hook(
    controller: &Arc<BootstrapController>,
    shell: &HookChain<ErrorReport>,
) -> bool {
    let controller = Arc::downgrade(controller);
    shell.wrap(TRACEBACK_HOOK_TAG, move |report, next| {
        if let Some(controller) = controller.upgrade() {
            controller.log_uncaught(report);
        }
        next(report);
    })
}
