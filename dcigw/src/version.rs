use std::fmt;

/// Build-time version information stamped in by the build script.
pub struct VersionInfo {
    pub package_name: &'static str,
    pub package_version: &'static str,
    pub git_hash: &'static str,
    pub git_dirty: bool,
    pub build_date: &'static str,
}

impl VersionInfo {
    pub fn current() -> Self {
        VersionInfo {
            package_name: env!("CARGO_PKG_NAME"),
            package_version: env!("CARGO_PKG_VERSION"),
            git_hash: env!("GIT_HASH"),
            git_dirty: env!("GIT_DIRTY") == "true",
            build_date: env!("BUILD_DATE"),
        }
    }

    pub fn short_version(&self) -> String {
        let dirty_indicator = if self.git_dirty { "-dirty" } else { "" };
        format!(
            "{} {} ({}{})",
            self.package_name, self.package_version, self.git_hash, dirty_indicator
        )
    }
}

impl fmt::Display for VersionInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}\nBuild Date: {}",
            self.short_version(),
            self.build_date
        )
    }
}
