// Copyright Materialize, Inc. All rights reserved.
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License in the LICENSE file at the
// root of this repository, or online at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

use codes_iso_3166::part_1::CountryCode;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_enum_str::{Deserialize_enum_str, Serialize_enum_str};
use serde_json::Value;

use crate::error::Error;
use crate::record::{record_model, Field, Model, Record, Validate};
use crate::union::{self, Union};

const TAX_ID_TYPE: Field<TaxIdType> = Field::required("type");
const TAX_ID_VALUE: Field<String> = Field::required("value");
const TAX_ID_COUNTRY: Field<CountryCode> = Field::required("country");

const TAX_EXEMPT: Field<bool> = Field::required("tax_exempt");
const TAX_PROVIDER: Field<String> = Field::required("tax_provider");
const TAX_EXEMPTION_CODE: Field<String> = Field::optional_nullable("tax_exemption_code");
const AUTOMATIC_TAX_ENABLED: Field<bool> = Field::optional_nullable("automatic_tax_enabled");

record_model! {
    /// Tax ID details to display on an invoice.
    pub struct TaxId;
}

impl TaxId {
    /// Creates a tax ID.
    pub fn new(type_: TaxIdType, value: &str, country: CountryCode) -> Result<TaxId, Error> {
        let mut record = Record::builder();
        record
            .set(&TAX_ID_TYPE, &type_)
            .set(&TAX_ID_VALUE, value)
            .set(&TAX_ID_COUNTRY, &country);
        record.build().map(TaxId)
    }

    /// The type of the tax ID.
    pub fn type_(&self) -> Result<TaxIdType, Error> {
        self.0.require(&TAX_ID_TYPE)
    }

    /// The value of the tax ID.
    pub fn value(&self) -> Result<String, Error> {
        self.0.require(&TAX_ID_VALUE)
    }

    /// The country of the tax ID.
    pub fn country(&self) -> Result<CountryCode, Error> {
        self.0.require(&TAX_ID_COUNTRY)
    }
}

impl Validate for TaxId {
    fn validate(&self) -> Result<(), Error> {
        self.type_()?;
        self.value()?;
        self.country()?;
        Ok(())
    }
}

/// The type of a [`TaxId`].
///
/// See: <https://docs.withorb.com/docs/orb-docs/api-reference/schemas/customer-tax-id>
#[non_exhaustive]
#[derive(Clone, Debug, PartialEq, Hash, Deserialize_enum_str, Serialize_enum_str)]
#[serde(rename_all = "snake_case")]
pub enum TaxIdType {
    /// United Arab Emirates Tax Registration Number.
    AeTrn,
    /// Australian Business Number.
    AuAbn,
    /// Australian Taxation Office Reference Number.
    AuArn,
    /// Bulgaria Unified Identification Code.
    BgUic,
    /// Brazilian CNPJ number.
    BrCnpj,
    /// Brazilian CPF number.
    BrCpf,
    /// Canadian BN.
    CaBn,
    /// Canadian GST/HST number.
    CaGstHst,
    /// Canadian PST number (British Columbia).
    CaPstBc,
    /// Canadian PST number (Manitoba).
    CaPstMb,
    /// Canadian PST number (Saskatchewan).
    CaPstSk,
    /// Canadian QST number (Qu√©bec).
    CaQst,
    /// Switzerland VAT number.
    ChVat,
    /// Chilean TIN.
    ClTin,
    /// Spanish NIF number (previously Spanish CIF number).
    EsCif,
    /// European One Stop Shop VAT number for non-Union scheme.
    EuOssVat,
    /// European VAT number.
    EuVat,
    /// United Kingdom VAT number.
    GbVat,
    /// Georgian VAT.
    GeVat,
    /// Hong Kong BR number.
    HkBr,
    /// Hungary tax number.
    HuTin,
    /// Indonesian NPWP number.
    IdNpwp,
    /// Israel VAT.
    IlVat,
    /// Indian GST number.
    InGst,
    /// Icelandic VAT.
    IsVat,
    /// Japanese Corporate Number.
    JpCn,
    /// Japanese Registered Foreign Businesses' Registration Number.
    JpRn,
    /// Japanese Tax Registration Number.
    JpTrn,
    /// Korean BRN.
    KrBrn,
    /// Liechtensteinian UID number.
    LiUid,
    /// Mexican RFC number.
    MxRfc,
    /// Malaysian FRP number.
    MyFrp,
    /// Malaysian ITN.
    MyItn,
    /// Malaysian SST number.
    MySst,
    /// Norwegian VAT number.
    NoVat,
    /// New Zealand GST number
    NzGst,
    /// Russian INN.
    RuInn,
    /// Russian KPP.
    RuKpp,
    /// Saudi Arabia VAT.
    SaVat,
    /// Singaporean GST.
    SgGst,
    /// Singaporean UEN.
    SgUen,
    /// Slovenia tax number.
    SiTin,
    /// Thai VAT.
    ThVat,
    /// Taiwanese VAT.
    TwVat,
    /// Ukrainian VAT.
    UaVat,
    /// United States EIN.
    UsEin,
    /// South African VAT number.
    ZaVat,
    /// Other.
    #[serde(other)]
    Other(String),
}

fn new_tax_configuration(provider: &str, tax_exempt: bool) -> Result<Record, Error> {
    let mut record = Record::builder();
    record
        .set(&TAX_EXEMPT, &tax_exempt)
        .set(&TAX_PROVIDER, provider);
    record.build()
}

fn validate_tax_configuration(record: &Record, provider: &str) -> Result<(), Error> {
    record.expect_constant(&TAX_PROVIDER, provider)?;
    record.require(&TAX_EXEMPT)?;
    Ok(())
}

record_model! {
    /// Tax calculation through Avalara.
    pub struct AvalaraTaxConfiguration;
}

impl AvalaraTaxConfiguration {
    /// The `tax_provider` of this shape.
    pub const PROVIDER: &'static str = "avalara";

    /// Creates an Avalara tax configuration.
    pub fn new(tax_exempt: bool) -> Result<AvalaraTaxConfiguration, Error> {
        new_tax_configuration(Self::PROVIDER, tax_exempt).map(AvalaraTaxConfiguration)
    }

    /// Returns a copy with the exemption code set.
    pub fn with_tax_exemption_code(&self, code: &str) -> Result<AvalaraTaxConfiguration, Error> {
        self.0
            .with(&TAX_EXEMPTION_CODE, code)
            .map(AvalaraTaxConfiguration)
    }

    /// Whether the customer is exempt from tax.
    pub fn tax_exempt(&self) -> Result<bool, Error> {
        self.0.require(&TAX_EXEMPT)
    }

    /// The Avalara exemption code.
    pub fn tax_exemption_code(&self) -> Result<Option<String>, Error> {
        self.0.get(&TAX_EXEMPTION_CODE)
    }
}

impl Validate for AvalaraTaxConfiguration {
    fn validate(&self) -> Result<(), Error> {
        validate_tax_configuration(&self.0, Self::PROVIDER)?;
        self.tax_exemption_code()?;
        Ok(())
    }
}

record_model! {
    /// Tax calculation through TaxJar.
    pub struct TaxJarTaxConfiguration;
}

impl TaxJarTaxConfiguration {
    /// The `tax_provider` of this shape.
    pub const PROVIDER: &'static str = "taxjar";

    /// Creates a TaxJar tax configuration.
    pub fn new(tax_exempt: bool) -> Result<TaxJarTaxConfiguration, Error> {
        new_tax_configuration(Self::PROVIDER, tax_exempt).map(TaxJarTaxConfiguration)
    }

    /// Whether the customer is exempt from tax.
    pub fn tax_exempt(&self) -> Result<bool, Error> {
        self.0.require(&TAX_EXEMPT)
    }
}

impl Validate for TaxJarTaxConfiguration {
    fn validate(&self) -> Result<(), Error> {
        validate_tax_configuration(&self.0, Self::PROVIDER)
    }
}

record_model! {
    /// Tax calculation through Sphere.
    pub struct SphereTaxConfiguration;
}

impl SphereTaxConfiguration {
    /// The `tax_provider` of this shape.
    pub const PROVIDER: &'static str = "sphere";

    /// Creates a Sphere tax configuration.
    pub fn new(tax_exempt: bool) -> Result<SphereTaxConfiguration, Error> {
        new_tax_configuration(Self::PROVIDER, tax_exempt).map(SphereTaxConfiguration)
    }

    /// Whether the customer is exempt from tax.
    pub fn tax_exempt(&self) -> Result<bool, Error> {
        self.0.require(&TAX_EXEMPT)
    }
}

impl Validate for SphereTaxConfiguration {
    fn validate(&self) -> Result<(), Error> {
        validate_tax_configuration(&self.0, Self::PROVIDER)
    }
}

record_model! {
    /// Tax calculation through Numeral.
    pub struct NumeralTaxConfiguration;
}

impl NumeralTaxConfiguration {
    /// The `tax_provider` of this shape.
    pub const PROVIDER: &'static str = "numeral";

    /// Creates a Numeral tax configuration.
    pub fn new(tax_exempt: bool) -> Result<NumeralTaxConfiguration, Error> {
        new_tax_configuration(Self::PROVIDER, tax_exempt).map(NumeralTaxConfiguration)
    }

    /// Whether the customer is exempt from tax.
    pub fn tax_exempt(&self) -> Result<bool, Error> {
        self.0.require(&TAX_EXEMPT)
    }
}

impl Validate for NumeralTaxConfiguration {
    fn validate(&self) -> Result<(), Error> {
        validate_tax_configuration(&self.0, Self::PROVIDER)
    }
}

record_model! {
    /// Tax calculation through Anrok.
    pub struct AnrokTaxConfiguration;
}

impl AnrokTaxConfiguration {
    /// The `tax_provider` of this shape.
    pub const PROVIDER: &'static str = "anrok";

    /// Creates an Anrok tax configuration.
    pub fn new(tax_exempt: bool) -> Result<AnrokTaxConfiguration, Error> {
        new_tax_configuration(Self::PROVIDER, tax_exempt).map(AnrokTaxConfiguration)
    }

    /// Whether the customer is exempt from tax.
    pub fn tax_exempt(&self) -> Result<bool, Error> {
        self.0.require(&TAX_EXEMPT)
    }
}

impl Validate for AnrokTaxConfiguration {
    fn validate(&self) -> Result<(), Error> {
        validate_tax_configuration(&self.0, Self::PROVIDER)
    }
}

record_model! {
    /// Tax calculation through Stripe Tax.
    pub struct StripeTaxConfiguration;
}

impl StripeTaxConfiguration {
    /// The `tax_provider` of this shape.
    pub const PROVIDER: &'static str = "stripe";

    /// Creates a Stripe tax configuration.
    pub fn new(tax_exempt: bool) -> Result<StripeTaxConfiguration, Error> {
        new_tax_configuration(Self::PROVIDER, tax_exempt).map(StripeTaxConfiguration)
    }

    /// Returns a copy with automatic tax calculation switched on or off.
    pub fn with_automatic_tax_enabled(&self, enabled: bool) -> Result<StripeTaxConfiguration, Error> {
        self.0
            .with(&AUTOMATIC_TAX_ENABLED, &enabled)
            .map(StripeTaxConfiguration)
    }

    /// Whether the customer is exempt from tax.
    pub fn tax_exempt(&self) -> Result<bool, Error> {
        self.0.require(&TAX_EXEMPT)
    }

    /// Whether Stripe calculates tax automatically.
    pub fn automatic_tax_enabled(&self) -> Result<Option<bool>, Error> {
        self.0.get(&AUTOMATIC_TAX_ENABLED)
    }
}

impl Validate for StripeTaxConfiguration {
    fn validate(&self) -> Result<(), Error> {
        validate_tax_configuration(&self.0, Self::PROVIDER)?;
        self.automatic_tax_enabled()?;
        Ok(())
    }
}

/// The tax provider configured for a customer, selected by `tax_provider`.
#[derive(Debug, Clone)]
pub enum TaxConfiguration {
    /// Avalara.
    Avalara(AvalaraTaxConfiguration),
    /// TaxJar.
    TaxJar(TaxJarTaxConfiguration),
    /// Sphere.
    Sphere(SphereTaxConfiguration),
    /// Numeral.
    Numeral(NumeralTaxConfiguration),
    /// Anrok.
    Anrok(AnrokTaxConfiguration),
    /// Stripe Tax.
    Stripe(StripeTaxConfiguration),
    /// A configuration that matched none of the known providers.
    Unknown(Value),
}

impl TaxConfiguration {
    /// Whether the customer is exempt from tax.
    pub fn tax_exempt(&self) -> Result<bool, Error> {
        self.known_or_err()?.require(&TAX_EXEMPT)
    }

    /// The tax provider.
    pub fn tax_provider(&self) -> Result<String, Error> {
        self.known_or_err()?.require(&TAX_PROVIDER)
    }
}

impl Union for TaxConfiguration {
    const NAME: &'static str = "TaxConfiguration";
    const DISCRIMINATOR: &'static str = "tax_provider";

    fn decode_variant(tag: &str, record: Record) -> Option<Result<Self, Error>> {
        let config = match tag {
            AvalaraTaxConfiguration::PROVIDER => {
                union::variant(record).map(TaxConfiguration::Avalara)
            }
            TaxJarTaxConfiguration::PROVIDER => union::variant(record).map(TaxConfiguration::TaxJar),
            SphereTaxConfiguration::PROVIDER => union::variant(record).map(TaxConfiguration::Sphere),
            NumeralTaxConfiguration::PROVIDER => {
                union::variant(record).map(TaxConfiguration::Numeral)
            }
            AnrokTaxConfiguration::PROVIDER => union::variant(record).map(TaxConfiguration::Anrok),
            StripeTaxConfiguration::PROVIDER => union::variant(record).map(TaxConfiguration::Stripe),
            _ => return None,
        };
        Some(config)
    }

    fn unknown(value: Value) -> Self {
        TaxConfiguration::Unknown(value)
    }

    fn known(&self) -> Option<&Record> {
        match self {
            TaxConfiguration::Avalara(c) => Some(c.record()),
            TaxConfiguration::TaxJar(c) => Some(c.record()),
            TaxConfiguration::Sphere(c) => Some(c.record()),
            TaxConfiguration::Numeral(c) => Some(c.record()),
            TaxConfiguration::Anrok(c) => Some(c.record()),
            TaxConfiguration::Stripe(c) => Some(c.record()),
            TaxConfiguration::Unknown(_) => None,
        }
    }

    fn unknown_value(&self) -> Option<&Value> {
        match self {
            TaxConfiguration::Unknown(value) => Some(value),
            _ => None,
        }
    }
}

impl Validate for TaxConfiguration {
    fn validate(&self) -> Result<(), Error> {
        match self {
            TaxConfiguration::Avalara(c) => c.validate(),
            TaxConfiguration::TaxJar(c) => c.validate(),
            TaxConfiguration::Sphere(c) => c.validate(),
            TaxConfiguration::Numeral(c) => c.validate(),
            TaxConfiguration::Anrok(c) => c.validate(),
            TaxConfiguration::Stripe(c) => c.validate(),
            TaxConfiguration::Unknown(_) => union::validate(self),
        }
    }
}

impl PartialEq for TaxConfiguration {
    fn eq(&self, other: &TaxConfiguration) -> bool {
        union::wire_eq(self, other)
    }
}

impl Serialize for TaxConfiguration {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        union::encode(self).serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for TaxConfiguration {
    fn deserialize<D>(d: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        Value::deserialize(d).map(union::decode)
    }
}

impl From<AvalaraTaxConfiguration> for TaxConfiguration {
    fn from(config: AvalaraTaxConfiguration) -> TaxConfiguration {
        TaxConfiguration::Avalara(config)
    }
}

impl From<TaxJarTaxConfiguration> for TaxConfiguration {
    fn from(config: TaxJarTaxConfiguration) -> TaxConfiguration {
        TaxConfiguration::TaxJar(config)
    }
}

impl From<SphereTaxConfiguration> for TaxConfiguration {
    fn from(config: SphereTaxConfiguration) -> TaxConfiguration {
        TaxConfiguration::Sphere(config)
    }
}

impl From<NumeralTaxConfiguration> for TaxConfiguration {
    fn from(config: NumeralTaxConfiguration) -> TaxConfiguration {
        TaxConfiguration::Numeral(config)
    }
}

impl From<AnrokTaxConfiguration> for TaxConfiguration {
    fn from(config: AnrokTaxConfiguration) -> TaxConfiguration {
        TaxConfiguration::Anrok(config)
    }
}

impl From<StripeTaxConfiguration> for TaxConfiguration {
    fn from(config: StripeTaxConfiguration) -> TaxConfiguration {
        TaxConfiguration::Stripe(config)
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_decode_each_provider() {
        for (provider, expected) in [
            ("avalara", "Avalara"),
            ("taxjar", "TaxJar"),
            ("sphere", "Sphere"),
            ("numeral", "Numeral"),
            ("anrok", "Anrok"),
            ("stripe", "Stripe"),
        ] {
            let value = json!({ "tax_exempt": false, "tax_provider": provider });
            let config: TaxConfiguration = serde_json::from_value(value.clone()).unwrap();
            assert!(format!("{config:?}").starts_with(expected), "{config:?}");
            assert_eq!(config.tax_provider().unwrap(), provider);
            assert!(!config.tax_exempt().unwrap());
            assert_eq!(serde_json::to_value(&config).unwrap(), value);
        }
    }

    #[test]
    fn test_unknown_provider_round_trips() {
        let value = json!({ "tax_exempt": true, "tax_provider": "vertex", "region": "eu" });
        let config: TaxConfiguration = serde_json::from_value(value.clone()).unwrap();
        assert!(matches!(config, TaxConfiguration::Unknown(_)));
        assert!(matches!(
            config.validate(),
            Err(Error::UnknownVariant { .. })
        ));
        assert!(matches!(
            config.tax_exempt(),
            Err(Error::UnknownVariant { .. })
        ));
        assert_eq!(serde_json::to_value(&config).unwrap(), value);
    }

    #[test]
    fn test_known_provider_with_bad_shape_falls_back() {
        let value = json!({ "tax_exempt": "no", "tax_provider": "avalara" });
        let config: TaxConfiguration = serde_json::from_value(value.clone()).unwrap();
        assert!(matches!(config, TaxConfiguration::Unknown(_)));
        assert_eq!(serde_json::to_value(&config).unwrap(), value);
    }

    #[test]
    fn test_programmatic_construction_matches_decoded() {
        let built: TaxConfiguration = AvalaraTaxConfiguration::new(true)
            .unwrap()
            .with_tax_exemption_code("E-1")
            .unwrap()
            .into();
        assert!(built.validate().is_ok());
        let decoded: TaxConfiguration = serde_json::from_value(json!({
            "tax_exemption_code": "E-1",
            "tax_provider": "avalara",
            "tax_exempt": true,
        }))
        .unwrap();
        assert_eq!(built, decoded);
        // An equivalent payload held opaquely compares equal too.
        let opaque = TaxConfiguration::Unknown(serde_json::to_value(&decoded).unwrap());
        assert_eq!(built, opaque);
    }

    #[test]
    fn test_stripe_automatic_tax() {
        let config = StripeTaxConfiguration::new(false)
            .unwrap()
            .with_automatic_tax_enabled(true)
            .unwrap();
        assert_eq!(config.automatic_tax_enabled().unwrap(), Some(true));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_tax_id_accessors() {
        let tax_id = TaxId::new(TaxIdType::UsEin, "12-3456789", CountryCode::US).unwrap();
        assert_eq!(tax_id.type_().unwrap(), TaxIdType::UsEin);
        assert_eq!(tax_id.value().unwrap(), "12-3456789");
        assert_eq!(tax_id.country().unwrap(), CountryCode::US);
        assert_eq!(
            serde_json::to_value(&tax_id).unwrap(),
            json!({ "type": "us_ein", "value": "12-3456789", "country": "US" })
        );

        let unknown: TaxId =
            serde_json::from_value(json!({ "type": "zz_new", "value": "1", "country": "US" }))
                .unwrap();
        assert_eq!(unknown.type_().unwrap(), TaxIdType::Other("zz_new".into()));
    }
}
