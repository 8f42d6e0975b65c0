//! Label data model: promo codes, schema variants and validated labels.

use std::fmt;
use std::str::FromStr;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize, Serializer};
use serde_json::{Map, Value};

use crate::validation::Validator;

/// Closed set of promotion-shape codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum PromoCode {
    /// No promotion.
    None,
    /// Flagship "supercena" price.
    Sup,
    /// Percentage discount.
    Disc,
    /// Percentage off when buying N.
    DealPct,
    /// Fixed price for N units.
    DealFix,
    /// Buy X get Y.
    Bxyg,
    /// Pack pricing.
    Pack,
}

impl PromoCode {
    pub const ALL: [PromoCode; 7] = [
        PromoCode::None,
        PromoCode::Sup,
        PromoCode::Disc,
        PromoCode::DealPct,
        PromoCode::DealFix,
        PromoCode::Bxyg,
        PromoCode::Pack,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            PromoCode::None => "NONE",
            PromoCode::Sup => "SUP",
            PromoCode::Disc => "DISC",
            PromoCode::DealPct => "DEALPCT",
            PromoCode::DealFix => "DEALFIX",
            PromoCode::Bxyg => "BXYG",
            PromoCode::Pack => "PACK",
        }
    }
}

impl fmt::Display for PromoCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PromoCode {
    type Err = String;

    /// Exact, case-sensitive match on the wire spelling.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        PromoCode::ALL
            .into_iter()
            .find(|code| code.as_str() == s)
            .ok_or_else(|| format!("unknown promo code '{}'", s))
    }
}

/// Which label shape is in force.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SchemaVariant {
    /// `{name, price, promo, promo_args}` with seven promo codes.
    #[default]
    Compact,
    /// `{name, price, promo, core, cond, nth}` with five promo codes.
    Decomposed,
}

impl SchemaVariant {
    /// Exact key set, sorted.
    pub fn keys(&self) -> &'static [&'static str] {
        match self {
            SchemaVariant::Compact => &["name", "price", "promo", "promo_args"],
            SchemaVariant::Decomposed => &["cond", "core", "name", "nth", "price", "promo"],
        }
    }

    /// String fields carrying promotion arguments.
    pub fn argument_fields(&self) -> &'static [&'static str] {
        match self {
            SchemaVariant::Compact => &["promo_args"],
            SchemaVariant::Decomposed => &["core", "cond", "nth"],
        }
    }

    pub fn allowed_codes(&self) -> &'static [PromoCode] {
        const DECOMPOSED: [PromoCode; 5] = [
            PromoCode::None,
            PromoCode::Sup,
            PromoCode::Disc,
            PromoCode::DealFix,
            PromoCode::Bxyg,
        ];
        match self {
            SchemaVariant::Compact => &PromoCode::ALL,
            SchemaVariant::Decomposed => &DECOMPOSED,
        }
    }

    pub fn allows(&self, code: PromoCode) -> bool {
        self.allowed_codes().contains(&code)
    }

    /// Sorted wire names of the allowed codes, for messages.
    pub fn allowed_names(&self) -> Vec<&'static str> {
        let mut names: Vec<_> = self.allowed_codes().iter().map(|c| c.as_str()).collect();
        names.sort_unstable();
        names
    }

    /// Map a free-form name (typically a directory name) to a promo code.
    ///
    /// The name is trimmed and upper-cased. The decomposed schema has no
    /// DEALPCT code, so that name narrows to DISC there.
    pub fn normalize_promo_name(&self, name: &str) -> Option<PromoCode> {
        let candidate = name.trim().to_uppercase();
        if candidate.is_empty() {
            return None;
        }
        let code = candidate.parse::<PromoCode>().ok()?;
        let code = match (*self, code) {
            (SchemaVariant::Decomposed, PromoCode::DealPct) => PromoCode::Disc,
            (_, code) => code,
        };
        self.allows(code).then_some(code)
    }
}

impl fmt::Display for SchemaVariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SchemaVariant::Compact => f.write_str("compact"),
            SchemaVariant::Decomposed => f.write_str("decomposed"),
        }
    }
}

/// A label accepted by the [`Validator`].
///
/// The original JSON object is kept verbatim (key order included) so that
/// persisting a label writes back exactly what the extractor produced.
#[derive(Debug, Clone, PartialEq)]
pub struct Label {
    fields: Map<String, Value>,
    promo: PromoCode,
    schema: SchemaVariant,
}

impl Label {
    /// Build a label from decoded JSON, going through the validator.
    ///
    /// Returns the first violated rule on rejection.
    pub fn from_value(value: Value, validator: &Validator) -> Result<Self, String> {
        let outcome = validator.validate(&value);
        if !outcome.accepted {
            return Err(outcome.reason);
        }

        let Value::Object(fields) = value else {
            return Err("not an object".to_string());
        };
        let promo = fields
            .get("promo")
            .and_then(Value::as_str)
            .and_then(|s| s.parse().ok())
            .ok_or_else(|| "promo missing".to_string())?;

        Ok(Self {
            fields,
            promo,
            schema: validator.schema(),
        })
    }

    /// Decode a JSON document and validate it.
    pub fn from_json(text: &str, validator: &Validator) -> Result<Self, String> {
        let value: Value = serde_json::from_str(text).map_err(|e| format!("invalid JSON: {}", e))?;
        Self::from_value(value, validator)
    }

    pub fn name(&self) -> &str {
        self.str_field("name").unwrap_or_default()
    }

    pub fn price(&self) -> Option<f64> {
        self.fields.get("price").and_then(Value::as_f64)
    }

    pub fn promo(&self) -> PromoCode {
        self.promo
    }

    pub fn schema(&self) -> SchemaVariant {
        self.schema
    }

    /// A string field of the label, if present.
    pub fn str_field(&self, key: &str) -> Option<&str> {
        self.fields.get(key).and_then(Value::as_str)
    }

    pub fn as_map(&self) -> &Map<String, Value> {
        &self.fields
    }

    pub fn to_value(&self) -> Value {
        Value::Object(self.fields.clone())
    }

    /// Indented JSON with non-ASCII characters kept literal.
    pub fn to_pretty_json(&self) -> String {
        // Serializing a map of JSON values cannot fail.
        serde_json::to_string_pretty(&self.fields).unwrap_or_default()
    }

    /// Typed view of the promotion; available for compact labels only.
    pub fn offer(&self) -> Option<Offer> {
        match self.schema {
            SchemaVariant::Compact => Offer::parse(self.promo, self.str_field("promo_args")?),
            SchemaVariant::Decomposed => None,
        }
    }
}

impl Serialize for Label {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.fields.serialize(serializer)
    }
}

/// Typed promotion decoded from a compact label's `promo_args`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Offer {
    None,
    SuperPrice { units: Option<u32> },
    Discount { percent: u8 },
    MultiBuyPercent { quantity: u32, percent: u8 },
    MultiBuyFixed { quantity: u32, price: Decimal },
    BuyGet { buy: u32, get: u32 },
    Pack(Vec<PackOffer>),
}

/// One alternative of a PACK promotion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PackOffer {
    /// Price for one pack of N units.
    Units(u32),
    /// Percentage off one N-pack.
    UnitsPercent { units: u32, percent: u8 },
    /// Deal over A packs of B units.
    Packs { packs: u32, units: u32 },
    /// Percentage off when buying A packs of B units.
    PacksPercent { packs: u32, units: u32, percent: u8 },
}

impl Offer {
    /// Decode arguments already accepted by the grammar.
    ///
    /// Returns `None` when the arguments do not fit the promo.
    pub fn parse(promo: PromoCode, args: &str) -> Option<Self> {
        match promo {
            PromoCode::None => args.is_empty().then_some(Offer::None),
            PromoCode::Sup if args.is_empty() => Some(Offer::SuperPrice { units: None }),
            PromoCode::Sup => Some(Offer::SuperPrice {
                units: Some(args.parse().ok()?),
            }),
            PromoCode::Disc => Some(Offer::Discount {
                percent: parse_percent(args)?,
            }),
            PromoCode::DealPct => {
                let (quantity, percent) = args.split_once(':')?;
                Some(Offer::MultiBuyPercent {
                    quantity: quantity.parse().ok()?,
                    percent: parse_percent(percent)?,
                })
            }
            PromoCode::DealFix => {
                let (quantity, price) = args.split_once('=')?;
                Some(Offer::MultiBuyFixed {
                    quantity: quantity.parse().ok()?,
                    price: Decimal::from_str(price).ok()?,
                })
            }
            PromoCode::Bxyg => {
                let (buy, get) = args.split_once(':')?;
                Some(Offer::BuyGet {
                    buy: buy.parse().ok()?,
                    get: get.parse().ok()?,
                })
            }
            PromoCode::Pack => args
                .split('|')
                .map(PackOffer::parse)
                .collect::<Option<Vec<_>>>()
                .map(Offer::Pack),
        }
    }
}

impl fmt::Display for Offer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Offer::None => write!(f, "no promotion"),
            Offer::SuperPrice { units: None } => write!(f, "super price"),
            Offer::SuperPrice { units: Some(units) } => write!(f, "super price from {} units", units),
            Offer::Discount { percent } => write!(f, "{}% off", percent),
            Offer::MultiBuyPercent { quantity, percent } => write!(f, "{}% off the {}th item", percent, quantity),
            Offer::MultiBuyFixed { quantity, price } => write!(f, "item {} for {}", quantity, price),
            Offer::BuyGet { buy, get } => write!(f, "buy {} get {}", buy, get),
            Offer::Pack(packs) => {
                let parts: Vec<String> = packs.iter().map(ToString::to_string).collect();
                write!(f, "pack: {}", parts.join(" or "))
            }
        }
    }
}

impl fmt::Display for PackOffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PackOffer::Units(units) => write!(f, "{}-pack", units),
            PackOffer::UnitsPercent { units, percent } => write!(f, "{}% off a {}-pack", percent, units),
            PackOffer::Packs { packs, units } => write!(f, "{} x {}-pack", packs, units),
            PackOffer::PacksPercent { packs, units, percent } => {
                write!(f, "{}% off {} x {}-pack", percent, packs, units)
            }
        }
    }
}

impl PackOffer {
    fn parse(token: &str) -> Option<Self> {
        let (size, percent) = match token.split_once(':') {
            Some((size, percent)) => (size, Some(parse_percent(percent)?)),
            None => (token, None),
        };

        match (size.split_once('x'), percent) {
            (Some((packs, units)), None) => Some(PackOffer::Packs {
                packs: packs.parse().ok()?,
                units: units.parse().ok()?,
            }),
            (Some((packs, units)), Some(percent)) => Some(PackOffer::PacksPercent {
                packs: packs.parse().ok()?,
                units: units.parse().ok()?,
                percent,
            }),
            (None, None) => Some(PackOffer::Units(size.parse().ok()?)),
            (None, Some(percent)) => Some(PackOffer::UnitsPercent {
                units: size.parse().ok()?,
                percent,
            }),
        }
    }
}

fn parse_percent(s: &str) -> Option<u8> {
    s.parse::<u8>().ok().filter(|p| *p <= 100)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn test_promo_code_round_trip_names() {
        for code in PromoCode::ALL {
            assert_eq!(code.as_str().parse::<PromoCode>().unwrap(), code);
        }
        assert!("disc".parse::<PromoCode>().is_err());
        assert_eq!(serde_json::to_value(PromoCode::DealPct).unwrap(), json!("DEALPCT"));
    }

    #[test]
    fn test_normalize_promo_name() {
        let compact = SchemaVariant::Compact;
        assert_eq!(compact.normalize_promo_name(" disc "), Some(PromoCode::Disc));
        assert_eq!(compact.normalize_promo_name("DealPct"), Some(PromoCode::DealPct));
        assert_eq!(compact.normalize_promo_name("UNKNOWN"), None);
        assert_eq!(compact.normalize_promo_name(""), None);

        let decomposed = SchemaVariant::Decomposed;
        assert_eq!(decomposed.normalize_promo_name("dealpct"), Some(PromoCode::Disc));
        assert_eq!(decomposed.normalize_promo_name("pack"), None);
    }

    #[test]
    fn test_label_keeps_key_order_and_unicode() {
        let validator = Validator::new(SchemaVariant::Compact);
        let label = Label::from_json(
            r#"{"promo":"DISC","name":"Masło ekstra","price":6.99,"promo_args":"30"}"#,
            &validator,
        )
        .unwrap();

        assert_eq!(label.name(), "Masło ekstra");
        assert_eq!(label.price(), Some(6.99));
        assert_eq!(label.promo(), PromoCode::Disc);
        let keys: Vec<_> = label.as_map().keys().cloned().collect();
        assert_eq!(keys, ["promo", "name", "price", "promo_args"]);
        assert!(label.to_pretty_json().contains("Masło ekstra"));
        assert!(label.to_pretty_json().contains("\n  \"name\""));
    }

    #[test]
    fn test_label_rejects_invalid() {
        let validator = Validator::new(SchemaVariant::Compact);
        let err = Label::from_value(json!({"name": "x"}), &validator).unwrap_err();
        assert!(err.starts_with("keys must be exactly"));
        assert!(Label::from_json("not json", &validator).unwrap_err().starts_with("invalid JSON"));
    }

    #[test]
    fn test_offer_decoding() {
        assert_eq!(Offer::parse(PromoCode::None, ""), Some(Offer::None));
        assert_eq!(Offer::parse(PromoCode::Sup, ""), Some(Offer::SuperPrice { units: None }));
        assert_eq!(Offer::parse(PromoCode::Sup, "2"), Some(Offer::SuperPrice { units: Some(2) }));
        assert_eq!(Offer::parse(PromoCode::Disc, "40"), Some(Offer::Discount { percent: 40 }));
        assert_eq!(
            Offer::parse(PromoCode::DealPct, "3:27"),
            Some(Offer::MultiBuyPercent { quantity: 3, percent: 27 })
        );
        assert_eq!(
            Offer::parse(PromoCode::DealFix, "2=1.00"),
            Some(Offer::MultiBuyFixed {
                quantity: 2,
                price: Decimal::from_str("1.00").unwrap()
            })
        );
        assert_eq!(Offer::parse(PromoCode::Bxyg, "4:2"), Some(Offer::BuyGet { buy: 4, get: 2 }));
        assert_eq!(
            Offer::parse(PromoCode::Pack, "2x6:50|12|6:43"),
            Some(Offer::Pack(vec![
                PackOffer::PacksPercent { packs: 2, units: 6, percent: 50 },
                PackOffer::Units(12),
                PackOffer::UnitsPercent { units: 6, percent: 43 },
            ]))
        );
        assert_eq!(Offer::parse(PromoCode::Disc, "101"), None);
    }

    #[test]
    fn test_offer_display() {
        let offer = Offer::parse(PromoCode::DealFix, "2=29.99").unwrap();
        assert_eq!(offer.to_string(), "item 2 for 29.99");
        let offer = Offer::parse(PromoCode::Pack, "2x6:50|12").unwrap();
        assert_eq!(offer.to_string(), "pack: 50% off 2 x 6-pack or 12-pack");
        assert_eq!(Offer::parse(PromoCode::Disc, "30").unwrap().to_string(), "30% off");
    }

    #[test]
    fn test_offer_only_for_compact() {
        let validator = Validator::new(SchemaVariant::Decomposed);
        let label = Label::from_value(
            json!({"name": "Kawa", "price": 19.99, "promo": "DISC", "core": "30", "cond": "", "nth": ""}),
            &validator,
        )
        .unwrap();
        assert_eq!(label.offer(), None);
    }
}
