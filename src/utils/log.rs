use log::LevelFilter;

pub struct Logger;

impl Logger {
    /// Install the global colog logger at the requested verbosity.
    pub fn init(verbosity: LevelFilter) {
        colog::default_builder().filter_level(verbosity).init();
    }
}
