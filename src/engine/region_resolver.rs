// ==========================================
// 药房配送协同系统 - 区域解析器
// ==========================================
// 职责: 将城市/街区自由文本解析为区域代码
// 输入: city, neighborhood (原始文本)
// 输出: RegionCode (未映射城市 → OTHER)
// 红线: 纯函数,无副作用; 同一张表下结果确定
// ==========================================
// 规则（顺序执行，命中即返回）:
// 1) 城市未映射 → OTHER
// 2) 街区 == "centro" → 城市默认区域（优先于任何覆写）
// 3) 街区存在覆写且覆写 != 默认 → 覆写
// 4) 其他 → 城市默认区域
// ==========================================

use crate::config::pricing_tables::CityRegionMap;
use crate::domain::types::RegionCode;
use std::collections::HashMap;
use tracing::debug;

pub use crate::domain::place_name::normalize_place_name;

/// 市中心街区名（规范化后）
const CENTRO: &str = "centro";

/// 解析索引中的单个城市
#[derive(Debug, Clone)]
struct CityRule {
    default: RegionCode,
    overrides: HashMap<String, RegionCode>,
}

/// 区域解析结果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RegionResolution {
    pub region: RegionCode,
    /// 城市是否命中映射表（false 即 UnmappedCity）
    pub city_mapped: bool,
}

// ==========================================
// RegionResolver - 区域解析器
// ==========================================
#[derive(Debug, Clone)]
pub struct RegionResolver {
    cities: HashMap<String, CityRule>,
}

impl RegionResolver {
    /// 从城市映射表构建解析器
    ///
    /// 构建时统一规范化键名,并丢弃值等于默认区域的冗余覆写
    ///
    /// 规范化后重名的键由 PricingTables::validate 拒绝
    pub fn new(city_regions: &CityRegionMap) -> Self {
        let cities = city_regions
            .cities
            .iter()
            .map(|(city, entry)| {
                let overrides = entry
                    .neighborhood_overrides
                    .iter()
                    .filter(|(_, region)| **region != entry.default)
                    .map(|(name, region)| (normalize_place_name(name), *region))
                    .collect();
                (
                    normalize_place_name(city),
                    CityRule {
                        default: entry.default,
                        overrides,
                    },
                )
            })
            .collect();

        Self { cities }
    }

    /// 解析区域代码
    pub fn resolve_region(&self, city: &str, neighborhood: &str) -> RegionCode {
        self.resolve(city, neighborhood).region
    }

    /// 解析区域代码,并返回城市是否命中
    pub fn resolve(&self, city: &str, neighborhood: &str) -> RegionResolution {
        let city_key = normalize_place_name(city);
        let rule = match self.cities.get(&city_key) {
            Some(rule) => rule,
            None => {
                debug!(city = %city, "城市未映射,区域降级为 OTHER");
                return RegionResolution {
                    region: RegionCode::Other,
                    city_mapped: false,
                };
            }
        };

        let neighborhood_key = normalize_place_name(neighborhood);
        let region = if neighborhood_key == CENTRO {
            rule.default
        } else {
            rule.overrides
                .get(&neighborhood_key)
                .copied()
                .unwrap_or(rule.default)
        };

        RegionResolution {
            region,
            city_mapped: true,
        }
    }
}
