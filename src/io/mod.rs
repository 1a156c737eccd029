// src/io/mod.rs
// 文件读写: Sensirion 读取, 呼吸表导出, 可选绘图
pub mod error;
pub mod export;
#[cfg(feature = "plot")]
pub mod plot;
pub mod sensirion;
pub mod source;
pub use error::WaveformIoError;
pub use export::{
    export_developer, export_standard, read_developer_csv, write_breath_table, Column,
    DEVELOPER_COLUMNS, STANDARD_COLUMNS,
};
#[cfg(feature = "plot")]
pub use plot::{render_breath_plot_png, PlotStyle};
pub use sensirion::{parse_sensirion, read_sensirion_file, DeviceBreathTable, SensirionFile};
pub use source::{
    ManualSource, Recording, RecordingAnalysis, SensirionSource, SourcePipeline, WaveformSource,
};
