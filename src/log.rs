// RustPixel
// copyright zipxing@hotmail.com 2022~2024

//! Log module provides the file logger used by hosts, reference
//! https://docs.rs/log4rs
//!
//! Pipeline components only use the `log` facade; installing a logger is up
//! to the host. Without the `log4rs` feature `init_log` is a no-op.

use crate::error::Result;
use log::LevelFilter;

#[cfg(feature = "log4rs")]
use crate::error::PipelineError;
#[cfg(feature = "log4rs")]
use log4rs::{
    append::file::FileAppender,
    config::{Appender, Config, Root},
    encode::pattern::PatternEncoder,
    filter::threshold::ThresholdFilter,
};

/// init logs system
#[allow(unused)]
pub fn init_log(level: LevelFilter, file_path: &str) -> Result<()> {
    #[cfg(feature = "log4rs")]
    {
        let logfile = FileAppender::builder()
            .encoder(Box::new(PatternEncoder::new(
                "{d(%Y-%m-%d %H:%M:%S)} {l} {t} {m}{n}",
            )))
            .build(file_path)?;
        let config = Config::builder()
            .appender(
                Appender::builder()
                    .filter(Box::new(ThresholdFilter::new(level)))
                    .build("logfile", Box::new(logfile)),
            )
            .build(Root::builder().appender("logfile").build(level))
            .map_err(|e| PipelineError::Config(format!("log config: {}", e)))?;
        log4rs::init_config(config)
            .map_err(|e| PipelineError::Config(format!("logger already set: {}", e)))?;
    }
    Ok(())
}
