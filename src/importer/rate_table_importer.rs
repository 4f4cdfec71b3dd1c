// ==========================================
// 药房配送协同系统 - 费率表 CSV 导入
// ==========================================
// 职责: CSV → RateTable（含行号定位的字段校验）
// 格式: carrier,region,normal_fee,unique_fee
//   - unique_fee 可为空
//   - 表头大小写不敏感,值首尾空白忽略
// 红线: 导入结果必须通过 RateTable::validate
// ==========================================

use crate::config::pricing_tables::{RateEntry, RateTable};
use crate::domain::types::{CarrierName, RegionCode};
use crate::importer::error::{ImportError, ImportResult};
use csv::ReaderBuilder;
use std::fs::File;
use std::io::Read;
use std::path::Path;
use tracing::info;

const COL_CARRIER: &str = "carrier";
const COL_REGION: &str = "region";
const COL_NORMAL_FEE: &str = "normal_fee";
const COL_UNIQUE_FEE: &str = "unique_fee";

pub struct RateTableImporter;

impl RateTableImporter {
    /// 从 CSV 文件导入
    pub fn import_from_path(&self, path: &Path) -> ImportResult<RateTable> {
        if !path.exists() {
            return Err(ImportError::FileNotFound(path.display().to_string()));
        }
        if let Some(ext) = path.extension() {
            if ext != "csv" {
                return Err(ImportError::UnsupportedFormat(
                    ext.to_string_lossy().to_string(),
                ));
            }
        }

        let file = File::open(path)?;
        let table = self.import_from_reader(file)?;
        info!(path = %path.display(), entries = table.entries().count(), "费率表导入完成");
        Ok(table)
    }

    /// 从任意 Reader 导入
    pub fn import_from_reader<R: Read>(&self, reader: R) -> ImportResult<RateTable> {
        let mut reader = ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .from_reader(reader);

        let headers: Vec<String> = reader
            .headers()?
            .iter()
            .map(|h| h.trim().to_lowercase())
            .collect();
        let column = |name: &str| -> ImportResult<usize> {
            headers
                .iter()
                .position(|h| h == name)
                .ok_or_else(|| ImportError::MissingColumn(name.to_string()))
        };
        let carrier_idx = column(COL_CARRIER)?;
        let region_idx = column(COL_REGION)?;
        let normal_idx = column(COL_NORMAL_FEE)?;
        let unique_idx = headers.iter().position(|h| h == COL_UNIQUE_FEE);

        let mut table = RateTable::default();
        for (idx, result) in reader.records().enumerate() {
            // 表头占第 1 行
            let row = idx + 2;
            let record = result?;
            let field = |i: usize| record.get(i).map(str::trim).unwrap_or("");

            if record.iter().all(|v| v.trim().is_empty()) {
                continue;
            }

            let carrier = CarrierName::from_str(field(carrier_idx)).ok_or_else(|| {
                ImportError::FieldValueError {
                    row,
                    field: COL_CARRIER.to_string(),
                    message: format!("未知承运商: {}", field(carrier_idx)),
                }
            })?;
            let region = RegionCode::from_str(field(region_idx)).ok_or_else(|| {
                ImportError::FieldValueError {
                    row,
                    field: COL_REGION.to_string(),
                    message: format!("未知区域: {}", field(region_idx)),
                }
            })?;
            let normal_fee = parse_fee(field(normal_idx), row, COL_NORMAL_FEE)?.ok_or_else(|| {
                ImportError::FieldValueError {
                    row,
                    field: COL_NORMAL_FEE.to_string(),
                    message: "不能为空".to_string(),
                }
            })?;
            let unique_fee = match unique_idx {
                Some(i) => parse_fee(field(i), row, COL_UNIQUE_FEE)?,
                None => None,
            };

            if table.get(carrier, region).is_some() {
                return Err(ImportError::DuplicateRate {
                    row,
                    carrier: carrier.to_string(),
                    region: region.to_string(),
                });
            }
            table.insert(
                carrier,
                region,
                RateEntry {
                    normal_fee,
                    unique_fee,
                },
            );
        }

        table
            .validate()
            .map_err(|e| ImportError::Validation(e.to_string()))?;
        Ok(table)
    }
}

/// 解析运费（空值 → None; 兼容逗号小数点）
fn parse_fee(raw: &str, row: usize, field: &str) -> ImportResult<Option<f64>> {
    if raw.is_empty() {
        return Ok(None);
    }
    raw.replace(',', ".")
        .parse::<f64>()
        .map(Some)
        .map_err(|e| ImportError::FieldValueError {
            row,
            field: field.to_string(),
            message: format!("{}: {}", raw, e),
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn import(csv: &str) -> ImportResult<RateTable> {
        RateTableImporter.import_from_reader(csv.as_bytes())
    }

    #[test]
    fn test_import_basic_table() {
        let table = import(
            "carrier,region,normal_fee,unique_fee\n\
             CARRIER_B,BC,7.00,12.00\n\
             CARRIER_B,ESTALEIRO,15,\n\
             carrier_a, itajai ,15,\n",
        )
        .unwrap();

        assert_eq!(
            table.get(CarrierName::CarrierB, RegionCode::Bc),
            Some(&RateEntry::tiered(7.0, 12.0))
        );
        assert_eq!(
            table.get(CarrierName::CarrierB, RegionCode::Estaleiro),
            Some(&RateEntry::normal(15.0))
        );
        assert_eq!(
            table.get(CarrierName::CarrierA, RegionCode::Itajai),
            Some(&RateEntry::normal(15.0))
        );
    }

    #[test]
    fn test_unique_fee_column_is_optional() {
        let table = import("Carrier,Region,Normal_Fee\nCARRIER_A,BC,8\n").unwrap();
        assert_eq!(
            table.get(CarrierName::CarrierA, RegionCode::Bc),
            Some(&RateEntry::normal(8.0))
        );
    }

    #[test]
    fn test_decimal_comma_accepted() {
        let table = import("carrier,region,normal_fee,unique_fee\nCARRIER_B,BC,\"7,50\",\"12,50\"\n")
            .unwrap();
        assert_eq!(
            table.get(CarrierName::CarrierB, RegionCode::Bc),
            Some(&RateEntry::tiered(7.5, 12.5))
        );
    }

    #[test]
    fn test_blank_rows_skipped() {
        let table = import("carrier,region,normal_fee\n,,\nCARRIER_A,BC,8\n").unwrap();
        assert_eq!(table.entries().count(), 1);
    }

    #[test]
    fn test_missing_column() {
        let err = import("carrier,normal_fee\nCARRIER_A,8\n").unwrap_err();
        assert!(matches!(err, ImportError::MissingColumn(ref c) if c == "region"));
    }

    #[test]
    fn test_unknown_region_reports_row() {
        let err = import("carrier,region,normal_fee\nCARRIER_A,BC,8\nCARRIER_A,LISBOA,8\n")
            .unwrap_err();
        assert!(matches!(err, ImportError::FieldValueError { row: 3, .. }));
    }

    #[test]
    fn test_duplicate_rate_rejected() {
        let err = import("carrier,region,normal_fee\nCARRIER_A,BC,8\nCARRIER_A,BC,9\n").unwrap_err();
        assert!(matches!(err, ImportError::DuplicateRate { row: 3, .. }));
    }

    #[test]
    fn test_unique_not_above_normal_rejected() {
        let err = import("carrier,region,normal_fee,unique_fee\nCARRIER_B,BC,12,7\n").unwrap_err();
        assert!(matches!(err, ImportError::Validation(_)));
    }

    #[test]
    fn test_other_region_rejected() {
        let err = import("carrier,region,normal_fee\nCARRIER_B,OTHER,10\n").unwrap_err();
        assert!(matches!(err, ImportError::Validation(_)));
    }

    #[test]
    fn test_missing_file() {
        let err = RateTableImporter
            .import_from_path(Path::new("/nonexistent/rates.csv"))
            .unwrap_err();
        assert!(matches!(err, ImportError::FileNotFound(_)));
    }
}
