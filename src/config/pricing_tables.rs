// ==========================================
// 药房配送协同系统 - 定价静态表
// ==========================================
// 职责: 城市→区域映射、区域→承运商映射、承运商×区域费率表
// 红线: 表为不可变配置数据,构造时校验,运行期只读共享 (Arc)
// 存储: config_kv (key='pricing/tables', JSON)
// ==========================================

use crate::domain::place_name::normalize_place_name;
use crate::domain::types::{CarrierName, RegionCode};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use thiserror::Error;

// ==========================================
// 配置层错误类型
// ==========================================
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("定价表校验失败: {0}")]
    InvalidTables(String),

    #[error("配置序列化失败: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("配置读取失败: {0}")]
    Repository(#[from] crate::repository::RepositoryError),
}

pub type ConfigResult<T> = Result<T, ConfigError>;

// ==========================================
// CityRegionMap - 城市→区域映射
// ==========================================

/// 单个城市的区域规则
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CityRegionEntry {
    /// 城市默认区域（必填）
    pub default: RegionCode,
    /// 街区覆写（值等于 default 的条目视为不存在）
    #[serde(default)]
    pub neighborhood_overrides: BTreeMap<String, RegionCode>,
}

impl CityRegionEntry {
    pub fn new(default: RegionCode) -> Self {
        Self {
            default,
            neighborhood_overrides: BTreeMap::new(),
        }
    }

    pub fn with_override(mut self, neighborhood: &str, region: RegionCode) -> Self {
        self.neighborhood_overrides
            .insert(neighborhood.to_string(), region);
        self
    }
}

/// 城市→区域映射（键为城市原始名称,解析器负责规范化）
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CityRegionMap {
    pub cities: BTreeMap<String, CityRegionEntry>,
}

impl CityRegionMap {
    pub fn with_city(mut self, city: &str, entry: CityRegionEntry) -> Self {
        self.cities.insert(city.to_string(), entry);
        self
    }
}

// ==========================================
// RegionCarrierMap - 区域→默认承运商
// ==========================================
// 不变式: 对所有非 OTHER 区域全覆盖
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RegionCarrierMap {
    pub carriers: BTreeMap<RegionCode, CarrierName>,
}

impl RegionCarrierMap {
    pub fn get(&self, region: RegionCode) -> Option<CarrierName> {
        self.carriers.get(&region).copied()
    }
}

// ==========================================
// RateTable - 费率表
// ==========================================

/// 单个 (承运商, 区域) 的费率
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RateEntry {
    pub normal_fee: f64,
    /// 独单价; 不变式: unique_fee > normal_fee
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unique_fee: Option<f64>,
}

impl RateEntry {
    pub fn normal(normal_fee: f64) -> Self {
        Self {
            normal_fee,
            unique_fee: None,
        }
    }

    pub fn tiered(normal_fee: f64, unique_fee: f64) -> Self {
        Self {
            normal_fee,
            unique_fee: Some(unique_fee),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RateTable {
    pub rates: BTreeMap<CarrierName, BTreeMap<RegionCode, RateEntry>>,
}

impl RateTable {
    /// 查询费率（OTHER 永远无记录）
    pub fn get(&self, carrier: CarrierName, region: RegionCode) -> Option<&RateEntry> {
        if region.is_other() {
            return None;
        }
        self.rates.get(&carrier).and_then(|m| m.get(&region))
    }

    pub fn insert(&mut self, carrier: CarrierName, region: RegionCode, entry: RateEntry) {
        self.rates.entry(carrier).or_default().insert(region, entry);
    }

    pub fn with_rate(mut self, carrier: CarrierName, region: RegionCode, entry: RateEntry) -> Self {
        self.insert(carrier, region, entry);
        self
    }

    /// 所有记录（按承运商、区域排序）
    pub fn entries(&self) -> impl Iterator<Item = (CarrierName, RegionCode, &RateEntry)> {
        self.rates.iter().flat_map(|(carrier, regions)| {
            regions
                .iter()
                .map(move |(region, entry)| (*carrier, *region, entry))
        })
    }

    /// 校验费率不变式
    pub fn validate(&self) -> ConfigResult<()> {
        for (carrier, region, entry) in self.entries() {
            if region.is_other() {
                return Err(ConfigError::InvalidTables(format!(
                    "{} 不允许为 OTHER 区域配置费率",
                    carrier
                )));
            }
            if !entry.normal_fee.is_finite() || entry.normal_fee < 0.0 {
                return Err(ConfigError::InvalidTables(format!(
                    "{}/{} normal_fee 非法: {}",
                    carrier, region, entry.normal_fee
                )));
            }
            if let Some(unique_fee) = entry.unique_fee {
                if !unique_fee.is_finite() || unique_fee <= entry.normal_fee {
                    return Err(ConfigError::InvalidTables(format!(
                        "{}/{} unique_fee={} 必须大于 normal_fee={}",
                        carrier, region, unique_fee, entry.normal_fee
                    )));
                }
            }
        }
        Ok(())
    }
}

// ==========================================
// PricingTables - 定价表集合
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PricingTables {
    pub city_regions: CityRegionMap,
    pub region_carriers: RegionCarrierMap,
    pub rates: RateTable,
}

impl PricingTables {
    /// 构造并校验
    pub fn new(
        city_regions: CityRegionMap,
        region_carriers: RegionCarrierMap,
        rates: RateTable,
    ) -> ConfigResult<Self> {
        let tables = Self {
            city_regions,
            region_carriers,
            rates,
        };
        tables.validate()?;
        Ok(tables)
    }

    /// 从 JSON 解析并校验
    pub fn from_json(raw: &str) -> ConfigResult<Self> {
        let tables: PricingTables = serde_json::from_str(raw)?;
        tables.validate()?;
        Ok(tables)
    }

    pub fn to_json(&self) -> ConfigResult<String> {
        Ok(serde_json::to_string(self)?)
    }

    /// 校验全部不变式
    ///
    /// - 城市名非空
    /// - 城市名、同城街区名规范化后不重名
    /// - 区域→承运商映射覆盖所有非 OTHER 区域,且不含 OTHER
    /// - 费率不变式（见 RateTable::validate）
    pub fn validate(&self) -> ConfigResult<()> {
        let mut seen_cities: HashMap<String, &str> = HashMap::new();
        for (city, entry) in &self.city_regions.cities {
            let city_key = normalize_place_name(city);
            if city_key.is_empty() {
                return Err(ConfigError::InvalidTables("城市名不能为空".to_string()));
            }
            if let Some(previous) = seen_cities.insert(city_key, city) {
                return Err(ConfigError::InvalidTables(format!(
                    "城市名规范化后重复: {} / {}",
                    previous, city
                )));
            }

            let mut seen_neighborhoods: HashMap<String, &str> = HashMap::new();
            for name in entry.neighborhood_overrides.keys() {
                if let Some(previous) = seen_neighborhoods.insert(normalize_place_name(name), name)
                {
                    return Err(ConfigError::InvalidTables(format!(
                        "{} 的街区名规范化后重复: {} / {}",
                        city, previous, name
                    )));
                }
            }
        }

        if self.region_carriers.carriers.contains_key(&RegionCode::Other) {
            return Err(ConfigError::InvalidTables(
                "OTHER 区域不能配置默认承运商".to_string(),
            ));
        }
        let missing: Vec<String> = RegionCode::ALL
            .iter()
            .filter(|r| !r.is_other() && !self.region_carriers.carriers.contains_key(r))
            .map(|r| r.to_string())
            .collect();
        if !missing.is_empty() {
            return Err(ConfigError::InvalidTables(format!(
                "区域缺少默认承运商: {}",
                missing.join(",")
            )));
        }

        self.rates.validate()
    }

    /// 内置默认表（坎布里乌沿海区域）
    pub fn builtin() -> Self {
        use CarrierName::{CarrierA, CarrierB};
        use RegionCode::*;

        let city_regions = CityRegionMap::default()
            .with_city(
                "Balneário Camboriú",
                CityRegionEntry::new(Bc)
                    .with_override("Centro", Bc)
                    .with_override("Pioneiros", Bc)
                    .with_override("Nova Esperança", NovaEsperanca)
                    .with_override("Barra", Barra)
                    .with_override("Estaleiro", Estaleiro)
                    .with_override("Estaleirinho", Estaleiro)
                    .with_override("Taquaras", Estaleiro),
            )
            .with_city("Camboriú", CityRegionEntry::new(Camboriu))
            .with_city("Itajaí", CityRegionEntry::new(Itajai))
            .with_city("Navegantes", CityRegionEntry::new(Navegantes))
            .with_city(
                "Itapema",
                CityRegionEntry::new(Itapema).with_override("Meia Praia", Itapema),
            );

        let region_carriers = RegionCarrierMap {
            carriers: [
                (Bc, CarrierB),
                (NovaEsperanca, CarrierB),
                (Barra, CarrierB),
                (Estaleiro, CarrierB),
                (Camboriu, CarrierB),
                (Itajai, CarrierA),
                (Navegantes, CarrierA),
                (Itapema, CarrierA),
            ]
            .into_iter()
            .collect(),
        };

        let rates = RateTable::default()
            .with_rate(CarrierB, Bc, RateEntry::tiered(7.0, 12.0))
            .with_rate(CarrierB, NovaEsperanca, RateEntry::tiered(9.0, 14.0))
            .with_rate(CarrierB, Barra, RateEntry::tiered(10.0, 15.0))
            .with_rate(CarrierB, Estaleiro, RateEntry::normal(15.0))
            .with_rate(CarrierB, Camboriu, RateEntry::tiered(12.0, 17.0))
            .with_rate(CarrierA, Bc, RateEntry::normal(8.0))
            .with_rate(CarrierA, NovaEsperanca, RateEntry::normal(10.0))
            .with_rate(CarrierA, Barra, RateEntry::normal(11.0))
            .with_rate(CarrierA, Estaleiro, RateEntry::normal(16.0))
            .with_rate(CarrierA, Camboriu, RateEntry::normal(13.0))
            .with_rate(CarrierA, Itajai, RateEntry::normal(15.0))
            .with_rate(CarrierA, Navegantes, RateEntry::normal(20.0))
            .with_rate(CarrierA, Itapema, RateEntry::normal(18.0));

        Self {
            city_regions,
            region_carriers,
            rates,
        }
    }
}
