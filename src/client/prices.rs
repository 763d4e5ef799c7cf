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

use std::collections::BTreeMap;

use futures_core::Stream;
use reqwest::Method;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_enum_str::{Deserialize_enum_str, Serialize_enum_str};
use serde_json::{Map, Value};
use time::OffsetDateTime;

use crate::client::Client;
use crate::error::Error;
use crate::page::{Page, PageRequest};
use crate::params::{ParamsBuilder, RequestParams, CURSOR, LIMIT};
use crate::record::{record_model, Field, Model, Record, RecordBuilder, Validate};
use crate::serde::Timestamp;
use crate::union::{self, Union};
use crate::util::StrIteratorExt;

const PRICES_PATH: [&str; 1] = ["prices"];

const ID: Field<String> = Field::required("id");
const NAME: Field<String> = Field::required("name");
const CURRENCY: Field<String> = Field::required("currency");
const CADENCE: Field<Cadence> = Field::required("cadence");
const PRICE_TYPE: Field<PriceType> = Field::required("price_type");
const EXTERNAL_PRICE_ID: Field<String> = Field::optional_nullable("external_price_id");
const ITEM: Field<PriceItem> = Field::required("item");
const BILLABLE_METRIC: Field<BillableMetricRef> = Field::optional_nullable("billable_metric");
const FIXED_PRICE_QUANTITY: Field<f64> = Field::optional_nullable("fixed_price_quantity");
const PLAN_PHASE_ORDER: Field<i64> = Field::optional_nullable("plan_phase_order");
const CONVERSION_RATE: Field<f64> = Field::optional_nullable("conversion_rate");
const CREATED_AT: Field<Timestamp> = Field::required("created_at");
const METADATA: Field<BTreeMap<String, String>> = Field::required("metadata");
const MODEL_TYPE: Field<String> = Field::required("model_type");

const METADATA_UPDATE: Field<Map<String, Value>> = Field::optional("metadata");

const ITEM_ID: Field<String> = Field::required("id");
const ITEM_NAME: Field<String> = Field::required("name");
const METRIC_ID: Field<String> = Field::required("id");

const UNIT_AMOUNT: Field<String> = Field::required("unit_amount");
const SCALING_FACTOR: Field<f64> = Field::optional_nullable("scaling_factor");
const PACKAGE_AMOUNT: Field<String> = Field::required("package_amount");
const PACKAGE_SIZE: Field<u64> = Field::required("package_size");
const DEFAULT_UNIT_AMOUNT: Field<String> = Field::required("default_unit_amount");
const DIMENSIONS: Field<Vec<Option<String>>> = Field::required("dimensions");
const MATRIX_VALUES: Field<Vec<MatrixValue>> = Field::required("matrix_values");
const ALLOCATION: Field<f64> = Field::optional("allocation");
const DIMENSION_VALUES: Field<Vec<Option<String>>> = Field::required("dimension_values");
const TIERS: Field<Vec<Tier>> = Field::required("tiers");
const FIRST_UNIT: Field<f64> = Field::required("first_unit");
const LAST_UNIT: Field<f64> = Field::optional_nullable("last_unit");
const BPS: Field<f64> = Field::required("bps");
const PER_UNIT_MAXIMUM: Field<String> = Field::optional_nullable("per_unit_maximum");
const BULK_TIERS: Field<Vec<BulkTier>> = Field::required("tiers");
const MAXIMUM_UNITS: Field<f64> = Field::optional_nullable("maximum_units");
const BULK_BPS_TIERS: Field<Vec<BulkBpsTier>> = Field::required("tiers");
const BPS_TIERS: Field<Vec<BpsTier>> = Field::required("tiers");
const MINIMUM_AMOUNT: Field<String> = Field::required("minimum_amount");
const MAXIMUM_AMOUNT: Field<String> = Field::optional_nullable("maximum_amount");

/// Generates one record-backed shape per pricing model and the [`Price`]
/// union over them.
///
/// Every shape carries the common price fields plus a single
/// `<model_type>_config` object.
macro_rules! price_models {
    ($(
        $(#[$meta:meta])*
        $variant:ident($shape:ident) = $tag:literal, $config_fn:ident: $config:ty;
    )*) => {
        $(
            record_model! {
                $(#[$meta])*
                pub struct $shape;
            }

            impl $shape {
                /// The `model_type` of this shape.
                pub const MODEL_TYPE: &'static str = $tag;

                const CONFIG: Field<$config> = Field::required(concat!($tag, "_config"));

                /// Creates a price from its common fields and its pricing
                /// configuration.
                pub fn new(common: PriceBuilder, config: &$config) -> Result<$shape, Error> {
                    let mut record = common.0;
                    record
                        .set(&MODEL_TYPE, Self::MODEL_TYPE)
                        .set(&Self::CONFIG, config);
                    record.build().map($shape)
                }

                /// The pricing configuration.
                pub fn $config_fn(&self) -> Result<$config, Error> {
                    self.0.require(&Self::CONFIG)
                }
            }

            impl Validate for $shape {
                fn validate(&self) -> Result<(), Error> {
                    self.0.expect_constant(&MODEL_TYPE, Self::MODEL_TYPE)?;
                    validate_common(&self.0)?;
                    self.$config_fn()?.validate()
                }
            }

            impl From<$shape> for Price {
                fn from(price: $shape) -> Price {
                    Price::$variant(price)
                }
            }
        )*

        /// An Orb price, selected by its `model_type`.
        ///
        /// Prices with a model this crate does not know, or whose payload
        /// does not match the shape of its model, decode to
        /// [`Price::Unknown`] and re-encode to the exact JSON received.
        #[derive(Debug, Clone)]
        pub enum Price {
            $(
                $(#[$meta])*
                $variant($shape),
            )*
            /// A price that matched none of the known shapes.
            Unknown(Value),
        }

        impl Union for Price {
            const NAME: &'static str = "Price";
            const DISCRIMINATOR: &'static str = "model_type";

            fn decode_variant(tag: &str, record: Record) -> Option<Result<Self, Error>> {
                let price = match tag {
                    $($tag => union::variant(record).map(Price::$variant),)*
                    _ => return None,
                };
                Some(price)
            }

            fn unknown(value: Value) -> Self {
                Price::Unknown(value)
            }

            fn known(&self) -> Option<&Record> {
                match self {
                    $(Price::$variant(price) => Some(price.record()),)*
                    Price::Unknown(_) => None,
                }
            }

            fn unknown_value(&self) -> Option<&Value> {
                match self {
                    Price::Unknown(value) => Some(value),
                    _ => None,
                }
            }
        }

        impl Validate for Price {
            fn validate(&self) -> Result<(), Error> {
                match self {
                    $(Price::$variant(price) => price.validate(),)*
                    Price::Unknown(_) => union::validate(self),
                }
            }
        }
    };
}

price_models! {
    /// With unit pricing, each unit costs a fixed amount.
    Unit(UnitPrice) = "unit", unit_config: UnitConfig;
    /// Units are billed in packages of a fixed size.
    Package(PackagePrice) = "package", package_config: PackageConfig;
    /// The unit amount depends on the values of one or two event
    /// properties.
    Matrix(MatrixPrice) = "matrix", matrix_config: MatrixConfig;
    /// The cost of a unit depends on the tier range it falls into.
    Tiered(TieredPrice) = "tiered", tiered_config: TieredConfig;
    /// Basis-point pricing applied per tier of transaction volume.
    TieredBps(TieredBpsPrice) = "tiered_bps", tiered_bps_config: TieredBpsConfig;
    /// A fee in basis points of the usage amount.
    Bps(BpsPrice) = "bps", bps_config: BpsConfig;
    /// Basis-point pricing where the total volume selects a single tier.
    BulkBps(BulkBpsPrice) = "bulk_bps", bulk_bps_config: BulkBpsConfig;
    /// The total quantity selects a single tier that prices every unit.
    Bulk(BulkPrice) = "bulk", bulk_config: BulkConfig;
    /// A total amount selected by thresholds on the quantity.
    ThresholdTotalAmount(ThresholdTotalAmountPrice) = "threshold_total_amount",
        threshold_total_amount_config: CustomConfig;
    /// Tiered pricing over packages of units.
    TieredPackage(TieredPackagePrice) = "tiered_package", tiered_package_config: CustomConfig;
    /// Tiered pricing applied separately to each group of usage.
    GroupedTiered(GroupedTieredPrice) = "grouped_tiered", grouped_tiered_config: CustomConfig;
    /// Tiered pricing with a minimum per tier.
    TieredWithMinimum(TieredWithMinimumPrice) = "tiered_with_minimum",
        tiered_with_minimum_config: CustomConfig;
    /// Tiered package pricing with a minimum per tier.
    TieredPackageWithMinimum(TieredPackageWithMinimumPrice) = "tiered_package_with_minimum",
        tiered_package_with_minimum_config: CustomConfig;
    /// Package pricing with an included allocation.
    PackageWithAllocation(PackageWithAllocationPrice) = "package_with_allocation",
        package_with_allocation_config: CustomConfig;
    /// Unit pricing with a percentage of the total.
    UnitWithPercent(UnitWithPercentPrice) = "unit_with_percent",
        unit_with_percent_config: CustomConfig;
    /// Matrix pricing with an included allocation.
    MatrixWithAllocation(MatrixWithAllocationPrice) = "matrix_with_allocation",
        matrix_with_allocation_config: MatrixConfig;
    /// Tiered pricing prorated over the billing period.
    TieredWithProration(TieredWithProrationPrice) = "tiered_with_proration",
        tiered_with_proration_config: CustomConfig;
    /// Unit pricing prorated over the billing period.
    UnitWithProration(UnitWithProrationPrice) = "unit_with_proration",
        unit_with_proration_config: CustomConfig;
    /// An allocation per group of usage with overage pricing.
    GroupedAllocation(GroupedAllocationPrice) = "grouped_allocation",
        grouped_allocation_config: CustomConfig;
    /// Grouped pricing with a prorated minimum per group.
    GroupedWithProratedMinimum(GroupedWithProratedMinimumPrice) = "grouped_with_prorated_minimum",
        grouped_with_prorated_minimum_config: CustomConfig;
    /// Grouped pricing with a metered minimum per group.
    GroupedWithMeteredMinimum(GroupedWithMeteredMinimumPrice) = "grouped_with_metered_minimum",
        grouped_with_metered_minimum_config: CustomConfig;
    /// Matrix pricing with display names for each dimension value.
    MatrixWithDisplayName(MatrixWithDisplayNamePrice) = "matrix_with_display_name",
        matrix_with_display_name_config: CustomConfig;
    /// Bulk pricing prorated over the billing period.
    BulkWithProration(BulkWithProrationPrice) = "bulk_with_proration",
        bulk_with_proration_config: CustomConfig;
    /// Tiered package pricing applied separately to each group of usage.
    GroupedTieredPackage(GroupedTieredPackagePrice) = "grouped_tiered_package",
        grouped_tiered_package_config: CustomConfig;
    /// Tiered package pricing applied to the largest group of usage.
    MaxGroupTieredPackage(MaxGroupTieredPackagePrice) = "max_group_tiered_package",
        max_group_tiered_package_config: CustomConfig;
    /// Matrix pricing scaled by a per-unit factor.
    ScalableMatrixWithUnitPricing(ScalableMatrixWithUnitPricingPrice) =
        "scalable_matrix_with_unit_pricing",
        scalable_matrix_with_unit_pricing_config: CustomConfig;
    /// Matrix pricing scaled by tiers.
    ScalableMatrixWithTieredPricing(ScalableMatrixWithTieredPricingPrice) =
        "scalable_matrix_with_tiered_pricing",
        scalable_matrix_with_tiered_pricing_config: CustomConfig;
    /// Bulk pricing over usage accumulated across groups.
    CumulativeGroupedBulk(CumulativeGroupedBulkPrice) = "cumulative_grouped_bulk",
        cumulative_grouped_bulk_config: CustomConfig;
}

fn validate_common(record: &Record) -> Result<(), Error> {
    record.require(&ID)?;
    record.require(&NAME)?;
    record.require(&CURRENCY)?;
    record.require(&CADENCE)?;
    record.require(&PRICE_TYPE)?;
    record.get(&EXTERNAL_PRICE_ID)?;
    record.require(&ITEM)?.validate()?;
    record.get(&BILLABLE_METRIC)?.validate()?;
    record.get(&FIXED_PRICE_QUANTITY)?;
    record.get(&PLAN_PHASE_ORDER)?;
    record.get(&CONVERSION_RATE)?;
    record.require(&CREATED_AT)?;
    record.require(&METADATA)?;
    Ok(())
}

impl Price {
    /// Returns a builder for the fields shared by every price.
    pub fn builder() -> PriceBuilder {
        PriceBuilder::default()
    }

    /// The Orb-assigned unique identifier for the price.
    pub fn id(&self) -> Result<String, Error> {
        self.known_or_err()?.require(&ID)
    }

    /// The name of the price.
    pub fn name(&self) -> Result<String, Error> {
        self.known_or_err()?.require(&NAME)
    }

    /// The currency of the price.
    pub fn currency(&self) -> Result<String, Error> {
        self.known_or_err()?.require(&CURRENCY)
    }

    /// How often the price is billed.
    pub fn cadence(&self) -> Result<Cadence, Error> {
        self.known_or_err()?.require(&CADENCE)
    }

    /// Whether the price is usage-based or fixed.
    pub fn price_type(&self) -> Result<PriceType, Error> {
        self.known_or_err()?.require(&PRICE_TYPE)
    }

    /// The user-defined alias of the price.
    pub fn external_price_id(&self) -> Result<Option<String>, Error> {
        self.known_or_err()?.get(&EXTERNAL_PRICE_ID)
    }

    /// The item the price bills for.
    pub fn item(&self) -> Result<PriceItem, Error> {
        self.known_or_err()?.require(&ITEM)
    }

    /// The metric the price is evaluated over, for usage prices.
    pub fn billable_metric(&self) -> Result<Option<BillableMetricRef>, Error> {
        self.known_or_err()?.get(&BILLABLE_METRIC)
    }

    /// The quantity billed by a fixed price.
    pub fn fixed_price_quantity(&self) -> Result<Option<f64>, Error> {
        self.known_or_err()?.get(&FIXED_PRICE_QUANTITY)
    }

    /// The plan phase the price belongs to.
    pub fn plan_phase_order(&self) -> Result<Option<i64>, Error> {
        self.known_or_err()?.get(&PLAN_PHASE_ORDER)
    }

    /// The rate converting the price's pricing unit into its currency.
    pub fn conversion_rate(&self) -> Result<Option<f64>, Error> {
        self.known_or_err()?.get(&CONVERSION_RATE)
    }

    /// The time at which the price was created.
    pub fn created_at(&self) -> Result<OffsetDateTime, Error> {
        Ok(self.known_or_err()?.require(&CREATED_AT)?.into_inner())
    }

    /// Arbitrary metadata attached to the price.
    pub fn metadata(&self) -> Result<BTreeMap<String, String>, Error> {
        self.known_or_err()?.require(&METADATA)
    }

    /// The pricing model.
    pub fn model_type(&self) -> Result<String, Error> {
        self.known_or_err()?.require(&MODEL_TYPE)
    }
}

impl PartialEq for Price {
    fn eq(&self, other: &Price) -> bool {
        union::wire_eq(self, other)
    }
}

impl Serialize for Price {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        union::encode(self).serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for Price {
    fn deserialize<D>(d: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        Value::deserialize(d).map(union::decode)
    }
}

/// A builder for the fields shared by every [`Price`] shape.
///
/// Pass the builder to the `new` constructor of a shape, such as
/// [`UnitPrice::new`], to complete the price.
#[derive(Debug, Clone, Default)]
pub struct PriceBuilder(RecordBuilder);

impl PriceBuilder {
    /// Sets the price ID.
    pub fn id(mut self, id: &str) -> Self {
        self.0.set(&ID, id);
        self
    }

    /// Sets the name.
    pub fn name(mut self, name: &str) -> Self {
        self.0.set(&NAME, name);
        self
    }

    /// Sets the currency.
    pub fn currency(mut self, currency: &str) -> Self {
        self.0.set(&CURRENCY, currency);
        self
    }

    /// Sets the cadence.
    pub fn cadence(mut self, cadence: Cadence) -> Self {
        self.0.set(&CADENCE, &cadence);
        self
    }

    /// Sets the price type.
    pub fn price_type(mut self, price_type: PriceType) -> Self {
        self.0.set(&PRICE_TYPE, &price_type);
        self
    }

    /// Sets the external price ID.
    pub fn external_price_id(mut self, external_price_id: Option<&str>) -> Self {
        self.0.set_opt(&EXTERNAL_PRICE_ID, external_price_id);
        self
    }

    /// Sets the item.
    pub fn item(mut self, item: &PriceItem) -> Self {
        self.0.set(&ITEM, item);
        self
    }

    /// Sets the fixed price quantity.
    pub fn fixed_price_quantity(mut self, quantity: Option<f64>) -> Self {
        self.0.set_opt(&FIXED_PRICE_QUANTITY, quantity.as_ref());
        self
    }

    /// Sets the creation time.
    pub fn created_at(mut self, created_at: OffsetDateTime) -> Self {
        self.0.set(&CREATED_AT, &Timestamp(created_at));
        self
    }

    /// Sets the metadata.
    pub fn metadata(mut self, metadata: &BTreeMap<String, String>) -> Self {
        self.0.set(&METADATA, metadata);
        self
    }
}

record_model! {
    /// The item a price bills for.
    pub struct PriceItem;
}

impl PriceItem {
    /// Creates an item reference.
    pub fn new(id: &str, name: &str) -> Result<PriceItem, Error> {
        let mut record = Record::builder();
        record.set(&ITEM_ID, id).set(&ITEM_NAME, name);
        record.build().map(PriceItem)
    }

    /// The item ID.
    pub fn id(&self) -> Result<String, Error> {
        self.0.require(&ITEM_ID)
    }

    /// The item name.
    pub fn name(&self) -> Result<String, Error> {
        self.0.require(&ITEM_NAME)
    }
}

impl Validate for PriceItem {
    fn validate(&self) -> Result<(), Error> {
        self.id()?;
        self.name()?;
        Ok(())
    }
}

record_model! {
    /// A reference to the billable metric of a usage price.
    pub struct BillableMetricRef;
}

impl BillableMetricRef {
    /// The metric ID.
    pub fn id(&self) -> Result<String, Error> {
        self.0.require(&METRIC_ID)
    }
}

impl Validate for BillableMetricRef {
    fn validate(&self) -> Result<(), Error> {
        self.id().map(|_| ())
    }
}

record_model! {
    /// Configuration for a unit price.
    pub struct UnitConfig;
}

impl UnitConfig {
    /// Creates a unit configuration charging `unit_amount` per unit.
    pub fn new(unit_amount: &str) -> Result<UnitConfig, Error> {
        let mut record = Record::builder();
        record.set(&UNIT_AMOUNT, unit_amount);
        record.build().map(UnitConfig)
    }

    /// The rate per unit of usage, as a decimal string.
    pub fn unit_amount(&self) -> Result<String, Error> {
        self.0.require(&UNIT_AMOUNT)
    }

    /// The multiplier applied to the rated quantity.
    pub fn scaling_factor(&self) -> Result<Option<f64>, Error> {
        self.0.get(&SCALING_FACTOR)
    }
}

impl Validate for UnitConfig {
    fn validate(&self) -> Result<(), Error> {
        self.unit_amount()?;
        self.scaling_factor()?;
        Ok(())
    }
}

record_model! {
    /// Configuration for a package price.
    pub struct PackageConfig;
}

impl PackageConfig {
    /// The price of one package, as a decimal string.
    pub fn package_amount(&self) -> Result<String, Error> {
        self.0.require(&PACKAGE_AMOUNT)
    }

    /// The number of units in a package.
    pub fn package_size(&self) -> Result<u64, Error> {
        self.0.require(&PACKAGE_SIZE)
    }
}

impl Validate for PackageConfig {
    fn validate(&self) -> Result<(), Error> {
        self.package_amount()?;
        self.package_size()?;
        Ok(())
    }
}

record_model! {
    /// Configuration for a matrix price.
    pub struct MatrixConfig;
}

impl MatrixConfig {
    /// The unit amount for usage matching no matrix value.
    pub fn default_unit_amount(&self) -> Result<String, Error> {
        self.0.require(&DEFAULT_UNIT_AMOUNT)
    }

    /// The event properties that select a matrix value.
    pub fn dimensions(&self) -> Result<Vec<Option<String>>, Error> {
        self.0.require(&DIMENSIONS)
    }

    /// The unit amounts per combination of dimension values.
    pub fn matrix_values(&self) -> Result<Vec<MatrixValue>, Error> {
        self.0.require(&MATRIX_VALUES)
    }

    /// The included allocation, for matrix prices with an allocation.
    pub fn allocation(&self) -> Result<Option<f64>, Error> {
        self.0.get(&ALLOCATION)
    }
}

impl Validate for MatrixConfig {
    fn validate(&self) -> Result<(), Error> {
        self.default_unit_amount()?;
        self.dimensions()?;
        self.matrix_values()?.validate()?;
        self.allocation()?;
        Ok(())
    }
}

record_model! {
    /// A single cell of a [`MatrixConfig`].
    pub struct MatrixValue;
}

impl MatrixValue {
    /// The dimension values this cell matches, in dimension order.
    pub fn dimension_values(&self) -> Result<Vec<Option<String>>, Error> {
        self.0.require(&DIMENSION_VALUES)
    }

    /// The rate per unit of matching usage.
    pub fn unit_amount(&self) -> Result<String, Error> {
        self.0.require(&UNIT_AMOUNT)
    }
}

impl Validate for MatrixValue {
    fn validate(&self) -> Result<(), Error> {
        self.dimension_values()?;
        self.unit_amount()?;
        Ok(())
    }
}

record_model! {
    /// Configuration for a tiered price.
    pub struct TieredConfig;
}

impl TieredConfig {
    /// The tiers, in ascending order.
    pub fn tiers(&self) -> Result<Vec<Tier>, Error> {
        self.0.require(&TIERS)
    }
}

impl Validate for TieredConfig {
    fn validate(&self) -> Result<(), Error> {
        self.tiers()?.validate()
    }
}

record_model! {
    /// A tier of a [`TieredConfig`].
    pub struct Tier;
}

impl Tier {
    /// The inclusive lower bound of the tier.
    pub fn first_unit(&self) -> Result<f64, Error> {
        self.0.require(&FIRST_UNIT)
    }

    /// The exclusive upper bound of the tier, or `None` for the last tier.
    pub fn last_unit(&self) -> Result<Option<f64>, Error> {
        self.0.get(&LAST_UNIT)
    }

    /// The rate per unit within the tier.
    pub fn unit_amount(&self) -> Result<String, Error> {
        self.0.require(&UNIT_AMOUNT)
    }
}

impl Validate for Tier {
    fn validate(&self) -> Result<(), Error> {
        self.first_unit()?;
        self.last_unit()?;
        self.unit_amount()?;
        Ok(())
    }
}

record_model! {
    /// Configuration for a basis-point price.
    pub struct BpsConfig;
}

impl BpsConfig {
    /// The fee in basis points.
    pub fn bps(&self) -> Result<f64, Error> {
        self.0.require(&BPS)
    }

    /// The maximum fee per unit.
    pub fn per_unit_maximum(&self) -> Result<Option<String>, Error> {
        self.0.get(&PER_UNIT_MAXIMUM)
    }
}

impl Validate for BpsConfig {
    fn validate(&self) -> Result<(), Error> {
        self.bps()?;
        self.per_unit_maximum()?;
        Ok(())
    }
}

record_model! {
    /// Configuration for a bulk price.
    pub struct BulkConfig;
}

impl BulkConfig {
    /// The tiers, in ascending order.
    pub fn tiers(&self) -> Result<Vec<BulkTier>, Error> {
        self.0.require(&BULK_TIERS)
    }
}

impl Validate for BulkConfig {
    fn validate(&self) -> Result<(), Error> {
        self.tiers()?.validate()
    }
}

record_model! {
    /// A tier of a [`BulkConfig`].
    pub struct BulkTier;
}

impl BulkTier {
    /// The upper bound of the tier, or `None` for the last tier.
    pub fn maximum_units(&self) -> Result<Option<f64>, Error> {
        self.0.get(&MAXIMUM_UNITS)
    }

    /// The rate per unit when the total falls in this tier.
    pub fn unit_amount(&self) -> Result<String, Error> {
        self.0.require(&UNIT_AMOUNT)
    }
}

impl Validate for BulkTier {
    fn validate(&self) -> Result<(), Error> {
        self.maximum_units()?;
        self.unit_amount()?;
        Ok(())
    }
}

record_model! {
    /// Configuration for a bulk basis-point price.
    pub struct BulkBpsConfig;
}

impl BulkBpsConfig {
    /// The tiers, in ascending order.
    pub fn tiers(&self) -> Result<Vec<BulkBpsTier>, Error> {
        self.0.require(&BULK_BPS_TIERS)
    }
}

impl Validate for BulkBpsConfig {
    fn validate(&self) -> Result<(), Error> {
        self.tiers()?.validate()
    }
}

record_model! {
    /// A tier of a [`BulkBpsConfig`].
    pub struct BulkBpsTier;
}

impl BulkBpsTier {
    /// The upper bound of the tier's volume, or `None` for the last tier.
    pub fn maximum_amount(&self) -> Result<Option<String>, Error> {
        self.0.get(&MAXIMUM_AMOUNT)
    }

    /// The fee in basis points.
    pub fn bps(&self) -> Result<f64, Error> {
        self.0.require(&BPS)
    }

    /// The maximum fee per unit.
    pub fn per_unit_maximum(&self) -> Result<Option<String>, Error> {
        self.0.get(&PER_UNIT_MAXIMUM)
    }
}

impl Validate for BulkBpsTier {
    fn validate(&self) -> Result<(), Error> {
        self.maximum_amount()?;
        self.bps()?;
        self.per_unit_maximum()?;
        Ok(())
    }
}

record_model! {
    /// Configuration for a tiered basis-point price.
    pub struct TieredBpsConfig;
}

impl TieredBpsConfig {
    /// The tiers, in ascending order.
    pub fn tiers(&self) -> Result<Vec<BpsTier>, Error> {
        self.0.require(&BPS_TIERS)
    }
}

impl Validate for TieredBpsConfig {
    fn validate(&self) -> Result<(), Error> {
        self.tiers()?.validate()
    }
}

record_model! {
    /// A tier of a [`TieredBpsConfig`].
    pub struct BpsTier;
}

impl BpsTier {
    /// The inclusive lower bound of the tier's volume.
    pub fn minimum_amount(&self) -> Result<String, Error> {
        self.0.require(&MINIMUM_AMOUNT)
    }

    /// The exclusive upper bound of the tier's volume.
    pub fn maximum_amount(&self) -> Result<Option<String>, Error> {
        self.0.get(&MAXIMUM_AMOUNT)
    }

    /// The fee in basis points.
    pub fn bps(&self) -> Result<f64, Error> {
        self.0.require(&BPS)
    }

    /// The maximum fee per unit.
    pub fn per_unit_maximum(&self) -> Result<Option<String>, Error> {
        self.0.get(&PER_UNIT_MAXIMUM)
    }
}

impl Validate for BpsTier {
    fn validate(&self) -> Result<(), Error> {
        self.minimum_amount()?;
        self.maximum_amount()?;
        self.bps()?;
        self.per_unit_maximum()?;
        Ok(())
    }
}

record_model! {
    /// A free-form pricing configuration.
    ///
    /// Used by the pricing models whose configuration has no fixed schema.
    /// Read its properties through [`CustomConfig::get`].
    pub struct CustomConfig;
}

impl CustomConfig {
    /// Creates a configuration from raw properties.
    pub fn new(properties: Map<String, Value>) -> CustomConfig {
        CustomConfig(Record::from_map(properties))
    }

    /// The raw value of the property `name`.
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.0.raw(name)
    }
}

impl Validate for CustomConfig {
    fn validate(&self) -> Result<(), Error> {
        Ok(())
    }
}

/// How often a price is billed.
#[non_exhaustive]
#[derive(Debug, Clone, PartialEq, Eq, Hash, Deserialize_enum_str, Serialize_enum_str)]
#[serde(rename_all = "snake_case")]
pub enum Cadence {
    /// Once.
    OneTime,
    /// Every month.
    Monthly,
    /// Every three months.
    Quarterly,
    /// Every six months.
    SemiAnnual,
    /// Every year.
    Annual,
    /// On a custom schedule.
    Custom,
    /// Other.
    #[serde(other)]
    Other(String),
}

/// Whether a price is usage-based or fixed.
#[non_exhaustive]
#[derive(Debug, Clone, PartialEq, Eq, Hash, Deserialize_enum_str, Serialize_enum_str)]
#[serde(rename_all = "snake_case")]
pub enum PriceType {
    /// Billed on metered usage.
    UsagePrice,
    /// Billed at a fixed quantity.
    FixedPrice,
    /// Other.
    #[serde(other)]
    Other(String),
}

/// Parameters for a price list operation.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PriceListParams(RequestParams);

impl PriceListParams {
    /// Returns a builder for price list parameters.
    pub fn builder() -> PriceListParamsBuilder {
        PriceListParamsBuilder::default()
    }

    /// The encoded request parameters.
    pub fn request_params(&self) -> &RequestParams {
        &self.0
    }
}

/// A builder for [`PriceListParams`].
#[derive(Debug, Clone, Default)]
pub struct PriceListParamsBuilder(ParamsBuilder);

impl PriceListParamsBuilder {
    /// Sets the page size.
    pub fn limit(mut self, limit: u64) -> Self {
        self.0.query.set(&LIMIT, &limit);
        self
    }

    /// Sets the cursor to resume from.
    pub fn cursor(mut self, cursor: Option<&str>) -> Self {
        self.0.query.set_opt(&CURSOR, cursor);
        self
    }

    /// Adds a header to the request.
    ///
    /// An invalid name or value is reported by `build`.
    pub fn header(mut self, name: &str, value: &str) -> Self {
        self.0.header(name, value);
        self
    }

    /// Freezes the parameters.
    pub fn build(self) -> Result<PriceListParams, Error> {
        self.0.build().map(PriceListParams)
    }
}

/// Parameters for [`Client::update_price`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PriceUpdateParams(RequestParams);

impl PriceUpdateParams {
    /// Returns a builder for price update parameters.
    pub fn builder() -> PriceUpdateParamsBuilder {
        PriceUpdateParamsBuilder::default()
    }

    /// The encoded request parameters.
    pub fn request_params(&self) -> &RequestParams {
        &self.0
    }
}

/// A builder for [`PriceUpdateParams`].
#[derive(Debug, Clone, Default)]
pub struct PriceUpdateParamsBuilder {
    params: ParamsBuilder,
    metadata: Map<String, Value>,
}

impl PriceUpdateParamsBuilder {
    /// Sets the metadata key `key` to `value`, or deletes the key if
    /// `value` is `None`.
    pub fn metadata(mut self, key: &str, value: Option<&str>) -> Self {
        let value = value.map_or(Value::Null, |v| Value::String(v.into()));
        self.metadata.insert(key.into(), value);
        self
    }

    /// Adds a header to the request.
    ///
    /// An invalid name or value is reported by `build`.
    pub fn header(mut self, name: &str, value: &str) -> Self {
        self.params.header(name, value);
        self
    }

    /// Freezes the parameters.
    pub fn build(mut self) -> Result<PriceUpdateParams, Error> {
        if !self.metadata.is_empty() {
            self.params.body.set(&METADATA_UPDATE, &self.metadata);
        }
        self.params.build().map(PriceUpdateParams)
    }
}

impl Client {
    /// Lists all prices.
    ///
    /// The underlying API call is paginated. The returned stream will fetch
    /// additional pages as it is consumed.
    pub fn list_prices(
        &self,
        params: &PriceListParams,
    ) -> impl Stream<Item = Result<Price, Error>> + '_ {
        self.stream_paginated_request(PageRequest::new(
            Method::GET,
            PRICES_PATH,
            params.0.clone(),
        ))
    }

    /// Fetches a single page of prices.
    pub async fn list_prices_page(&self, params: &PriceListParams) -> Result<Page<Price>, Error> {
        self.fetch_page(PageRequest::new(Method::GET, PRICES_PATH, params.0.clone()))
            .await
    }

    /// Gets a price by ID.
    pub async fn get_price(&self, id: &str) -> Result<Price, Error> {
        let req = self.build_request(
            Method::GET,
            PRICES_PATH.chain_one(id),
            &RequestParams::default(),
        );
        self.send_request(req).await
    }

    /// Gets a price by external ID.
    pub async fn get_price_by_external_id(&self, external_id: &str) -> Result<Price, Error> {
        let req = self.build_request(
            Method::GET,
            PRICES_PATH
                .chain_one("external_price_id")
                .chain_one(external_id),
            &RequestParams::default(),
        );
        self.send_request(req).await
    }

    /// Updates the metadata of a price.
    pub async fn update_price(&self, id: &str, params: &PriceUpdateParams) -> Result<Price, Error> {
        let req = self.build_request(Method::PUT, PRICES_PATH.chain_one(id), &params.0);
        self.send_request(req).await
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn new_year() -> OffsetDateTime {
        OffsetDateTime::from_unix_timestamp(1_704_067_200).unwrap()
    }

    fn unit_price() -> Value {
        json!({
            "id": "pr_1",
            "name": "API calls",
            "model_type": "unit",
            "currency": "usd",
            "cadence": "monthly",
            "price_type": "usage_price",
            "external_price_id": null,
            "item": { "id": "it_1", "name": "API calls" },
            "billable_metric": { "id": "bm_1" },
            "fixed_price_quantity": null,
            "plan_phase_order": null,
            "conversion_rate": null,
            "created_at": "2024-01-01T00:00:00Z",
            "metadata": {},
            "unit_config": { "unit_amount": "0.50", "scaling_factor": null },
            "minimum": null,
        })
    }

    #[test]
    fn test_unit_price_round_trip() {
        let value = unit_price();
        let price: Price = serde_json::from_value(value.clone()).unwrap();
        let Price::Unit(unit) = &price else {
            panic!("expected unit price, got {price:?}");
        };
        assert_eq!(unit.unit_config().unwrap().unit_amount().unwrap(), "0.50");
        assert_eq!(price.currency().unwrap(), "usd");
        assert_eq!(price.cadence().unwrap(), Cadence::Monthly);
        assert_eq!(price.billable_metric().unwrap().unwrap().id().unwrap(), "bm_1");
        assert_eq!(price.created_at().unwrap(), new_year());
        assert!(price.validate().is_ok());
        assert_eq!(serde_json::to_value(&price).unwrap(), value);
    }

    #[test]
    fn test_unknown_model_type_round_trips() {
        let value = json!({
            "model_type": "some_future_type",
            "currency": "usd",
            "future_config": { "knob": 3 },
        });
        let price: Price = serde_json::from_value(value.clone()).unwrap();
        assert!(matches!(price, Price::Unknown(_)));
        match price.validate() {
            Err(Error::UnknownVariant {
                union,
                discriminator,
            }) => {
                assert_eq!(union, "Price");
                assert_eq!(discriminator.as_deref(), Some("some_future_type"));
            }
            res => panic!("expected unknown variant error, got {res:?}"),
        }
        assert!(matches!(
            price.currency(),
            Err(Error::UnknownVariant { .. })
        ));
        assert_eq!(
            serde_json::to_string(&price).unwrap(),
            serde_json::to_string(&value).unwrap()
        );
    }

    #[test]
    fn test_malformed_known_model_falls_back() {
        let mut value = unit_price();
        value
            .as_object_mut()
            .unwrap()
            .remove("unit_config");
        let price: Price = serde_json::from_value(value.clone()).unwrap();
        assert!(matches!(price, Price::Unknown(_)));
        assert_eq!(serde_json::to_value(&price).unwrap(), value);
    }

    #[test]
    fn test_every_model_type_is_routed() {
        for (model_type, config) in [
            ("package", json!({ "package_amount": "5.00", "package_size": 100 })),
            (
                "tiered",
                json!({ "tiers": [
                    { "first_unit": 0, "last_unit": 10, "unit_amount": "1.00" },
                    { "first_unit": 10, "last_unit": null, "unit_amount": "0.50" },
                ] }),
            ),
            ("bps", json!({ "bps": 25, "per_unit_maximum": null })),
            ("bulk", json!({ "tiers": [{ "maximum_units": null, "unit_amount": "2.00" }] })),
            ("cumulative_grouped_bulk", json!({ "group": "region" })),
        ] {
            let mut value = unit_price();
            let fields = value.as_object_mut().unwrap();
            fields.remove("unit_config");
            fields.insert("model_type".into(), json!(model_type));
            fields.insert(format!("{model_type}_config"), config);
            let price: Price = serde_json::from_value(value.clone()).unwrap();
            assert!(!matches!(price, Price::Unknown(_)), "{model_type}");
            assert_eq!(price.model_type().unwrap(), model_type);
            assert!(price.validate().is_ok());
            assert_eq!(serde_json::to_value(&price).unwrap(), value);
        }
    }

    #[test]
    fn test_programmatic_price_equals_decoded() {
        let common = Price::builder()
            .id("pr_1")
            .name("API calls")
            .currency("usd")
            .cadence(Cadence::Monthly)
            .price_type(PriceType::UsagePrice)
            .item(&PriceItem::new("it_1", "API calls").unwrap())
            .created_at(new_year())
            .metadata(&BTreeMap::new());
        let built: Price = UnitPrice::new(common, &UnitConfig::new("0.50").unwrap())
            .unwrap()
            .into();
        assert!(built.validate().is_ok());

        let decoded: Price = serde_json::from_value(json!({
            "unit_config": { "unit_amount": "0.50" },
            "metadata": {},
            "created_at": "2024-01-01T00:00:00Z",
            "item": { "id": "it_1", "name": "API calls" },
            "price_type": "usage_price",
            "cadence": "monthly",
            "currency": "usd",
            "name": "API calls",
            "id": "pr_1",
            "model_type": "unit",
        }))
        .unwrap();
        assert_eq!(built, decoded);
    }

    #[test]
    fn test_update_params_metadata() {
        let params = PriceUpdateParams::builder()
            .metadata("team", Some("billing"))
            .metadata("legacy", None)
            .build()
            .unwrap();
        assert_eq!(
            params.request_params().body().to_value(),
            json!({ "metadata": { "team": "billing", "legacy": null } })
        );
        assert!(params.request_params().query().is_empty());
    }
}
