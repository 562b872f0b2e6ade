pub mod formatter;

pub use formatter::{
    format_average, format_catalog, format_json, format_plan_table, format_summary, format_tsv,
    should_use_colors,
};
