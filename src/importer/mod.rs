// ==========================================
// 药房配送协同系统 - 导入层
// ==========================================
// 职责: 外部费率数据导入（CSV）
// ==========================================

pub mod error;
pub mod rate_table_importer;

pub use error::{ImportError, ImportResult};
pub use rate_table_importer::RateTableImporter;
