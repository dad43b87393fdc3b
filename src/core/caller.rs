//! Source location of the code that emitted a record
//!
//! Every public entry point of the facility is `#[track_caller]`, so the
//! location the compiler hands us usually points past the facility's own
//! frames already. When it does not (a wrapper without `#[track_caller]`
//! that registered its file) or when the function name is missing, the
//! resolver walks the real call stack, skipping its own frames and every
//! frame in a skipped file. Without debug info the walk finds nothing and
//! the `#[track_caller]` location, or the unknown sentinel, is used.

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::panic::Location;

pub const UNKNOWN_FILE: &str = "(unknown file)";
pub const UNKNOWN_FUNCTION: &str = "(unknown function)";

pub(crate) const SOURCE_FILE: &str = file!();

/// Symbol path fragment shared by the resolver's own frames
const RESOLVER_SYMBOL: &str = "CallerResolver";

/// File, line and function of a log call
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceLocation {
    pub file: String,
    pub line: u32,
    pub function: String,
}

impl SourceLocation {
    pub fn new(file: impl Into<String>, line: u32, function: impl Into<String>) -> Self {
        Self {
            file: file.into(),
            line,
            function: function.into(),
        }
    }

    /// The `("(unknown file)", 0, "(unknown function)")` sentinel
    pub fn unknown() -> Self {
        Self::new(UNKNOWN_FILE, 0, UNKNOWN_FUNCTION)
    }

    pub fn is_unknown(&self) -> bool {
        self.file == UNKNOWN_FILE && self.line == 0
    }

    /// Final path component of `file`
    pub fn file_name(&self) -> &str {
        self.file
            .rsplit(['/', '\\'])
            .next()
            .unwrap_or(self.file.as_str())
    }

    /// `file_name` without its extension
    pub fn module(&self) -> &str {
        let name = self.file_name();
        name.rsplit_once('.').map_or(name, |(stem, _)| stem)
    }
}

impl fmt::Display for SourceLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{} in {}", self.file, self.line, self.function)
    }
}

/// One candidate frame, innermost first
#[derive(Debug, Clone, Copy)]
pub struct Frame<'a> {
    pub file: &'a str,
    pub line: u32,
    pub function: Option<&'a str>,
}

/// Finds the first frame outside the logging facility
#[derive(Debug)]
pub struct CallerResolver {
    skip: RwLock<Vec<String>>,
}

impl CallerResolver {
    /// Resolver that skips the facility's own files
    pub fn new() -> Self {
        let resolver = Self::empty();
        for file in facility_files() {
            resolver.skip_file(file);
        }
        resolver
    }

    /// Resolver with an empty skip set
    pub fn empty() -> Self {
        Self {
            skip: RwLock::new(Vec::new()),
        }
    }

    /// Treat `file` as part of the facility; adapters register `file!()` here
    pub fn skip_file(&self, file: &str) {
        let normalized = normalize(file);
        let mut skip = self.skip.write();
        if !skip.contains(&normalized) {
            skip.push(normalized);
        }
    }

    /// Whether `file` is, or ends with, a skipped path
    ///
    /// Debug info carries absolute paths while `file!()` is relative to the
    /// crate, so paths match on whole trailing components.
    pub fn is_skipped(&self, file: &str) -> bool {
        self.skip.read().iter().any(|entry| same_file(file, entry))
    }

    /// First frame whose file is not skipped, or the unknown sentinel
    pub fn resolve<'a, I>(&self, frames: I) -> SourceLocation
    where
        I: IntoIterator<Item = Frame<'a>>,
    {
        frames
            .into_iter()
            .find(|frame| !self.is_skipped(frame.file))
            .map(|frame| {
                SourceLocation::new(
                    frame.file,
                    frame.line,
                    frame.function.unwrap_or(UNKNOWN_FUNCTION),
                )
            })
            .unwrap_or_else(SourceLocation::unknown)
    }

    /// Location of the code that called into the facility
    ///
    /// `function` is the enclosing function as captured by the logging
    /// macros. With it and an unskipped `#[track_caller]` location, no stack
    /// walk is needed.
    #[track_caller]
    pub fn caller(&self, function: Option<&str>) -> SourceLocation {
        let location = Location::caller();
        if self.is_skipped(location.file()) {
            return self.walk().unwrap_or_else(SourceLocation::unknown);
        }
        if let Some(function) = function {
            return SourceLocation::new(location.file(), location.line(), function);
        }
        let function = self
            .walk()
            .filter(|walked| same_file(&walked.file, location.file()))
            .map_or_else(|| UNKNOWN_FUNCTION.to_string(), |walked| walked.function);
        SourceLocation::new(location.file(), location.line(), function)
    }

    /// First frame of the live stack outside the resolver and the skip set
    ///
    /// Frames below the resolver's own (the unwinder's) are ignored, as are
    /// frames without file and line information.
    #[inline(never)]
    fn walk(&self) -> Option<SourceLocation> {
        let mut entered = false;
        let mut found: Option<SourceLocation> = None;

        backtrace::trace(|frame| {
            backtrace::resolve_frame(frame, |symbol| {
                if found.is_some() {
                    return;
                }
                let name = symbol.name().map(|name| format!("{:#}", name));
                let in_resolver = name.as_deref().is_some_and(|n| n.contains(RESOLVER_SYMBOL));
                if !entered || in_resolver {
                    entered |= in_resolver;
                    return;
                }
                let (Some(file), Some(line)) = (symbol.filename(), symbol.lineno()) else {
                    return;
                };
                let file = file.to_string_lossy();
                let candidate = Frame {
                    file: &file,
                    line,
                    function: name.as_deref().map(short_function_name),
                };
                let location = self.resolve(std::iter::once(candidate));
                if !location.is_unknown() {
                    found = Some(location);
                }
            });
            found.is_none()
        });

        found
    }
}

impl Default for CallerResolver {
    fn default() -> Self {
        Self::new()
    }
}

fn facility_files() -> [&'static str; 4] {
    [
        SOURCE_FILE,
        super::logger::SOURCE_FILE,
        super::controller::SOURCE_FILE,
        super::hooks::SOURCE_FILE,
    ]
}

fn normalize(file: &str) -> String {
    file.replace('\\', "/")
}

fn same_file(a: &str, b: &str) -> bool {
    let (a, b) = (normalize(a), normalize(b));
    let (long, short) = if a.len() >= b.len() { (&a, &b) } else { (&b, &a) };
    long.strip_suffix(short.as_str())
        .is_some_and(|head| head.is_empty() || head.ends_with('/'))
}

/// Last path segment of a function path, without closure suffixes
fn short_function_name(path: &str) -> &str {
    let mut path = path;
    loop {
        let trimmed = path.strip_suffix("::{{closure}}").or_else(|| {
            path.strip_suffix('}')
                .and_then(|p| p.rsplit_once("::{closure#"))
                .map(|(head, _)| head)
        });
        match trimmed {
            Some(trimmed) => path = trimmed,
            None => break,
        }
    }
    path.rsplit("::").next().unwrap_or(path)
}

/// Short function name from a `type_name` path, used by the logging macros
#[doc(hidden)]
pub fn function_name(type_path: &'static str) -> &'static str {
    short_function_name(type_path.strip_suffix("::__f").unwrap_or(type_path))
}
