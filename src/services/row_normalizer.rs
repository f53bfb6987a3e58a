//! 行规范化服务 - 业务能力层
//!
//! 只负责"把一行原始数据变成 ShipmentRequest"，纯函数，无副作用

use regex::Regex;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use std::str::FromStr;
use std::sync::LazyLock;

use crate::config::{FieldLayout, PipelineConfig, SenderSource};
use crate::error::ShipmentError;
use crate::models::{Address, DistanceUnit, MassUnit, Parcel, ParcelDefaults, RawRow, ShipmentRequest};

/// 表格把邮编读成浮点数时留下的 ".0" 尾巴
static FLOAT_ZIP: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(\d+)\.0+$").expect("literal regex"));

/// 地址各字段对应的列名
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AddressColumns {
    pub name: String,
    pub company: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub street1: String,
    pub street2: Option<String>,
    pub city: String,
    pub state: String,
    pub zip: String,
    pub country: String,
}

impl AddressColumns {
    /// `name_from` / `name_to` 风格
    fn suffixed(suffix: &str) -> Self {
        let column = |base: &str| format!("{}_{}", base, suffix);

        Self {
            name: column("name"),
            company: Some(column("company")),
            email: Some(column("email")),
            phone: Some(column("phone")),
            street1: column("street1"),
            street2: Some(column("street2")),
            city: column("city"),
            state: column("state"),
            zip: column("zip"),
            country: column("country"),
        }
    }

    /// 地址不变量要求的列
    fn essentials(&self) -> [&str; 4] {
        [
            self.street1.as_str(),
            self.city.as_str(),
            self.zip.as_str(),
            self.country.as_str(),
        ]
    }

    fn read(&self, row: &RawRow) -> Address {
        let optional =
            |column: &Option<String>| column.as_deref().map(|c| row.text_or_empty(c)).unwrap_or_default();

        Address {
            name: row.text_or_empty(&self.name),
            company: optional(&self.company),
            email: optional(&self.email),
            phone: optional(&self.phone),
            street1: row.text_or_empty(&self.street1),
            street2: optional(&self.street2),
            city: row.text_or_empty(&self.city),
            state: row.text_or_empty(&self.state),
            zip: repair_zip(&row.text_or_empty(&self.zip)),
            country: row.text_or_empty(&self.country).to_ascii_uppercase(),
        }
    }
}

/// 包裹各字段对应的列名
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParcelColumns {
    /// 长 / 宽 / 高；布局中没有尺寸列时为 `None`
    pub dimensions: Option<[&'static str; 3]>,
    pub distance_unit: Option<&'static str>,
    pub weight: &'static str,
    pub mass_unit: &'static str,
    /// 有数量列时，总重 = 单件重量 × 数量
    pub quantity: Option<&'static str>,
}

/// 列布局
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldMap {
    pub recipient: AddressColumns,
    /// 行内发件人列；布局中没有时为 `None`
    pub sender: Option<AddressColumns>,
    pub parcel: ParcelColumns,
}

impl FieldMap {
    pub fn for_layout(layout: FieldLayout) -> Self {
        match layout {
            FieldLayout::Paired => Self {
                recipient: AddressColumns::suffixed("to"),
                sender: Some(AddressColumns::suffixed("from")),
                parcel: ParcelColumns {
                    dimensions: Some(["length", "width", "height"]),
                    distance_unit: Some("length_unit"),
                    weight: "weight",
                    mass_unit: "unit",
                    quantity: None,
                },
            },
            FieldLayout::RecipientSheet => Self {
                recipient: AddressColumns {
                    name: "Recipient Name".to_string(),
                    company: None,
                    email: Some("Email".to_string()),
                    phone: Some("Phone".to_string()),
                    street1: "Street Line 1".to_string(),
                    street2: Some("Street Line 2".to_string()),
                    city: "City".to_string(),
                    state: "State/Province".to_string(),
                    zip: "Zip/Postal Code".to_string(),
                    country: "Country".to_string(),
                },
                sender: None,
                parcel: ParcelColumns {
                    dimensions: None,
                    distance_unit: None,
                    weight: "Item Weight",
                    mass_unit: "Item Weight Unit",
                    quantity: Some("Quantity"),
                },
            },
        }
    }

    /// 布局默认的必填列
    pub fn default_mandatory(&self, sender_per_row: bool) -> Vec<String> {
        let mut fields = address_mandatory(&self.recipient);
        if sender_per_row {
            if let Some(sender) = &self.sender {
                fields.extend(address_mandatory(sender));
            }
        }
        fields.push(self.parcel.weight.to_string());
        fields.push(self.parcel.mass_unit.to_string());
        fields
    }
}

fn address_mandatory(columns: &AddressColumns) -> Vec<String> {
    [
        &columns.name,
        &columns.street1,
        &columns.city,
        &columns.state,
        &columns.zip,
        &columns.country,
    ]
    .into_iter()
    .cloned()
    .collect()
}

/// 行规范化器
///
/// 职责：
/// - 检查必填列，一次列出全部缺失列
/// - 构造发件地址（配置或行内）、收件地址、包裹
/// - 可选字段一律为空字符串
#[derive(Debug, Clone)]
pub struct RowNormalizer {
    fields: FieldMap,
    sender: SenderSource,
    default_parcel: Option<ParcelDefaults>,
    /// 声明的必填列 ∪ 结构性必填列，保持声明顺序
    required: Vec<String>,
}

impl RowNormalizer {
    /// 按流水线配置创建
    pub fn new(pipeline: &PipelineConfig) -> Self {
        let fields = FieldMap::for_layout(pipeline.field_layout);
        let sender_per_row = matches!(pipeline.sender, SenderSource::PerRow);

        let mut required = pipeline
            .mandatory_fields
            .clone()
            .unwrap_or_else(|| fields.default_mandatory(sender_per_row));

        let mut structural: Vec<&str> = fields.recipient.essentials().to_vec();
        if sender_per_row {
            if let Some(sender) = &fields.sender {
                structural.extend(sender.essentials());
            }
        }
        structural.push(fields.parcel.weight);
        structural.push(fields.parcel.mass_unit);
        if pipeline.default_parcel.is_none() {
            if let Some(dims) = fields.parcel.dimensions {
                structural.extend(dims);
            }
            if let Some(unit) = fields.parcel.distance_unit {
                structural.push(unit);
            }
        }

        for column in structural {
            if !required.iter().any(|r| r == column) {
                required.push(column.to_string());
            }
        }

        Self {
            fields,
            sender: pipeline.sender.clone(),
            default_parcel: pipeline.default_parcel.clone(),
            required,
        }
    }

    pub fn required_fields(&self) -> &[String] {
        &self.required
    }

    /// 收件人姓名列的值（用于日志和错误信息）
    pub fn recipient_name(&self, row: &RawRow) -> Option<String> {
        row.text(&self.fields.recipient.name)
    }

    /// 规范化一行
    ///
    /// # 返回
    /// 成功返回 `ShipmentRequest`；缺列返回 `ShipmentError::Validation`（列出全部缺失列），
    /// 取值非法返回 `ShipmentError::InvalidField`
    pub fn normalize(&self, row: &RawRow) -> Result<ShipmentRequest, ShipmentError> {
        let missing: Vec<String> = self
            .required
            .iter()
            .filter(|field| row.text(field).is_none())
            .cloned()
            .collect();
        if !missing.is_empty() {
            return Err(ShipmentError::Validation {
                missing_fields: missing,
            });
        }

        let origin = match (&self.sender, &self.fields.sender) {
            (SenderSource::Configured { address }, _) => address.clone(),
            (SenderSource::PerRow, Some(columns)) => columns.read(row),
            (SenderSource::PerRow, None) => {
                return Err(ShipmentError::invalid_field(
                    "sender",
                    "",
                    "layout has no sender columns and no sender address is configured",
                ))
            }
        };
        let destination = self.fields.recipient.read(row);
        let parcel = self.read_parcel(row)?;

        Ok(ShipmentRequest::new(origin, destination, parcel))
    }

    fn read_parcel(&self, row: &RawRow) -> Result<Parcel, ShipmentError> {
        let columns = &self.fields.parcel;

        let (length, width, height, distance_unit) = match (columns.dimensions, &self.default_parcel) {
            (Some(dims), defaults) => {
                let values: Vec<Option<String>> = dims.iter().map(|c| row.text(c)).collect();
                let absent: Vec<String> = dims
                    .iter()
                    .zip(&values)
                    .filter(|(_, v)| v.is_none())
                    .map(|(c, _)| c.to_string())
                    .collect();

                match (absent.len(), defaults) {
                    (3, Some(d)) => (d.length, d.width, d.height, d.distance_unit),
                    (0, _) => (
                        parse_positive(dims[0], values[0].as_deref().unwrap_or_default())?,
                        parse_positive(dims[1], values[1].as_deref().unwrap_or_default())?,
                        parse_positive(dims[2], values[2].as_deref().unwrap_or_default())?,
                        self.read_distance_unit(row)?,
                    ),
                    _ => {
                        return Err(ShipmentError::Validation {
                            missing_fields: absent,
                        })
                    }
                }
            }
            (None, Some(d)) => (d.length, d.width, d.height, d.distance_unit),
            (None, None) => {
                return Err(ShipmentError::invalid_field(
                    "dimensions",
                    "",
                    "layout has no dimension columns and no default parcel is configured",
                ))
            }
        };

        let mut weight = parse_positive(columns.weight, &row.text_or_empty(columns.weight))?;
        let mass_text = row.text_or_empty(columns.mass_unit);
        let mass_unit = MassUnit::parse(&mass_text).ok_or_else(|| {
            ShipmentError::invalid_field(columns.mass_unit, mass_text.clone(), "unknown mass unit")
        })?;

        if let Some(quantity_column) = columns.quantity {
            if let Some(text) = row.text(quantity_column) {
                let quantity = Decimal::from_str(&text)
                    .ok()
                    .filter(|d| d.fract().is_zero())
                    .and_then(|d| d.to_u32())
                    .filter(|q| *q > 0)
                    .ok_or_else(|| {
                        ShipmentError::invalid_field(
                            quantity_column,
                            text.clone(),
                            "expected a positive whole number",
                        )
                    })?;
                weight = weight.checked_mul(Decimal::from(quantity)).ok_or_else(|| {
                    ShipmentError::invalid_field(
                        quantity_column,
                        text.clone(),
                        "weight multiplied by quantity is out of range",
                    )
                })?;
            }
        }

        Ok(Parcel {
            length,
            width,
            height,
            distance_unit,
            weight,
            mass_unit,
        })
    }
}

impl RowNormalizer {
    /// 行内给出尺寸时的长度单位；单位列为空则退回默认尺寸的单位
    fn read_distance_unit(&self, row: &RawRow) -> Result<DistanceUnit, ShipmentError> {
        let column = self.fields.parcel.distance_unit;
        match (column.and_then(|c| row.text(c)), &self.default_parcel) {
            (Some(text), _) => DistanceUnit::parse(&text).ok_or_else(|| {
                ShipmentError::invalid_field(column.unwrap_or_default(), text.clone(), "unknown distance unit")
            }),
            (None, Some(d)) => Ok(d.distance_unit),
            (None, None) => Err(ShipmentError::Validation {
                missing_fields: column.map(|c| vec![c.to_string()]).unwrap_or_default(),
            }),
        }
    }
}

fn parse_positive(field: &str, text: &str) -> Result<Decimal, ShipmentError> {
    Decimal::from_str(text.trim())
        .ok()
        .filter(|d| d.is_sign_positive() && !d.is_zero())
        .ok_or_else(|| ShipmentError::invalid_field(field, text, "expected a positive number"))
}

/// "94117.0" → "94117"
fn repair_zip(zip: &str) -> String {
    FLOAT_ZIP
        .captures(zip)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().to_string())
        .unwrap_or_else(|| zip.to_string())
}
