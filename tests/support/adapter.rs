//! Thin wrapper over a logger handle, the way an application might add one

use bootlog::Logger;

pub struct AuditLog {
    log: Logger,
}

impl AuditLog {
    pub fn new(log: Logger) -> Self {
        log.controller().resolver().skip_file(file!());
        Self { log }
    }

    pub fn note(&self, what: &str) {
        self.log.info(format!("{} via audit log", what));
    }
}
