use phf::phf_map;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// 长度单位（Shippo `distance_unit`）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DistanceUnit {
    In,
    Cm,
    Mm,
    M,
    Ft,
    Yd,
}

/// 重量单位（Shippo `mass_unit`）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MassUnit {
    Lb,
    Oz,
    G,
    Kg,
}

static DISTANCE_ALIASES: phf::Map<&'static str, DistanceUnit> = phf_map! {
    "in" => DistanceUnit::In,
    "inch" => DistanceUnit::In,
    "inches" => DistanceUnit::In,
    "cm" => DistanceUnit::Cm,
    "mm" => DistanceUnit::Mm,
    "m" => DistanceUnit::M,
    "ft" => DistanceUnit::Ft,
    "yd" => DistanceUnit::Yd,
};

static MASS_ALIASES: phf::Map<&'static str, MassUnit> = phf_map! {
    "lb" => MassUnit::Lb,
    "lbs" => MassUnit::Lb,
    "pound" => MassUnit::Lb,
    "pounds" => MassUnit::Lb,
    "oz" => MassUnit::Oz,
    "ounce" => MassUnit::Oz,
    "ounces" => MassUnit::Oz,
    "g" => MassUnit::G,
    "gram" => MassUnit::G,
    "grams" => MassUnit::G,
    "kg" => MassUnit::Kg,
};

impl DistanceUnit {
    /// 解析单位别名（不区分大小写）
    pub fn parse(value: &str) -> Option<Self> {
        DISTANCE_ALIASES
            .get(value.trim().to_ascii_lowercase().as_str())
            .copied()
    }

    pub fn as_str(self) -> &'static str {
        match self {
            DistanceUnit::In => "in",
            DistanceUnit::Cm => "cm",
            DistanceUnit::Mm => "mm",
            DistanceUnit::M => "m",
            DistanceUnit::Ft => "ft",
            DistanceUnit::Yd => "yd",
        }
    }
}

impl MassUnit {
    /// 解析单位别名（不区分大小写）
    pub fn parse(value: &str) -> Option<Self> {
        MASS_ALIASES
            .get(value.trim().to_ascii_lowercase().as_str())
            .copied()
    }

    pub fn as_str(self) -> &'static str {
        match self {
            MassUnit::Lb => "lb",
            MassUnit::Oz => "oz",
            MassUnit::G => "g",
            MassUnit::Kg => "kg",
        }
    }
}

/// 包裹尺寸与重量
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Parcel {
    pub length: Decimal,
    pub width: Decimal,
    pub height: Decimal,
    pub distance_unit: DistanceUnit,
    pub weight: Decimal,
    pub mass_unit: MassUnit,
}

/// 行数据未提供尺寸时使用的默认包裹尺寸
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParcelDefaults {
    pub length: Decimal,
    pub width: Decimal,
    pub height: Decimal,
    pub distance_unit: DistanceUnit,
}

impl Default for ParcelDefaults {
    /// 6 × 6 × 2 英寸
    fn default() -> Self {
        Self {
            length: Decimal::from(6),
            width: Decimal::from(6),
            height: Decimal::from(2),
            distance_unit: DistanceUnit::In,
        }
    }
}
