//! Parsed export records and their typed accessor surface.
//!
//! A `Record` wraps the object node of one marker file. Everything reachable
//! from it goes through `get(FieldPath)` or one of the named accessors below;
//! there is no dynamic field access.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use chrono::NaiveDate;
use indexmap::IndexMap;
use serde::Serialize;

use crate::constants::record::{
    ACTION_KIND, ACTION_NODE, ADMIN_SECTION, BOOL_TRUE, DELETE_ACTION, EXTERNAL_ID_FIELD,
    HIGHLIGHT_FEATURES, MARKETING_RENT, MARKETING_SALE, MODIFIED_ON_FIELD, OBJECT_PATH,
    TITLE_IMAGE_GROUP,
};
use crate::convert::{ConvertedFields, RecordConverter};
use crate::errors::StoreError;
use crate::labels::LabelMapper;
use crate::types::{AssetPath, Label, ObjectId};
use crate::utils::{asset_display_path, normalize_inline_whitespace, normalize_object_id};

/// Typed XML field tree.
pub mod node;

pub use node::{FieldNode, FieldPath, TreeError};

/// What an archive asks the store to do with its object.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub enum RecordAction {
    /// Create the object or replace an existing one.
    Upsert,
    /// Remove the object.
    Delete,
}

/// Raw key paired with its display label.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct KeyLabel {
    /// Raw export value.
    pub key: String,
    /// Mapped label.
    pub label: Label,
}

/// Address and coordinates of an object.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct Location {
    /// Postal code as text (leading zeros are significant).
    pub postal_code: Option<String>,
    /// City.
    pub city: Option<String>,
    /// Street.
    pub street: Option<String>,
    /// House number.
    pub house_number: Option<String>,
    /// ISO country code.
    pub country: Option<String>,
    /// Latitude.
    pub latitude: Option<f64>,
    /// Longitude.
    pub longitude: Option<f64>,
}

/// Object category with its mapped detail attributes.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Category {
    /// Category element name (`haus`, `wohnung`, ...).
    pub key: String,
    /// Mapped category label.
    pub label: Label,
    /// Attribute name → mapped attribute value.
    pub detail: IndexMap<String, Label>,
}

/// One image or document attachment.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Attachment {
    /// Attachment group (`TITELBILD`, `BILD`, `GRUNDRISS`, ...).
    pub group: String,
    /// Display path built from store root, identifier and pointer.
    pub path: AssetPath,
    /// Attachment title, if present.
    pub title: Option<String>,
}

/// One parsed record.
#[derive(Clone, Debug)]
pub struct Record {
    object: FieldNode,
    origin: Option<PathBuf>,
    normalize_ids: bool,
    area_figures: OnceLock<ConvertedFields>,
}

impl Record {
    /// Wrap an already extracted object node.
    pub fn from_object_node(object: FieldNode) -> Self {
        Self {
            object,
            origin: None,
            normalize_ids: true,
            area_figures: OnceLock::new(),
        }
    }

    /// Parse a marker document; `origin` is used for error reporting.
    pub fn parse(xml: &str, origin: &Path) -> Result<Self, StoreError> {
        Self::from_document(FieldNode::parse_document(xml), origin)
    }

    /// Read and parse a marker file in the encoding its XML declaration names.
    pub fn open(path: &Path) -> Result<Self, StoreError> {
        let bytes = fs::read(path)?;
        Self::from_document(FieldNode::parse_bytes(&bytes), path)
    }

    fn from_document(
        document: Result<FieldNode, TreeError>,
        origin: &Path,
    ) -> Result<Self, StoreError> {
        let document = document.map_err(|err| StoreError::MalformedRecord {
            path: origin.to_path_buf(),
            details: err.to_string(),
        })?;
        let object = document
            .get(&FieldPath::from(OBJECT_PATH))
            .cloned()
            .ok_or_else(|| StoreError::MalformedRecord {
                path: origin.to_path_buf(),
                details: format!("missing {}", FieldPath::from(OBJECT_PATH)),
            })?;
        let mut record = Self::from_object_node(object);
        record.origin = Some(origin.to_path_buf());
        Ok(record)
    }

    /// Toggle identifier normalization used by `id()` and attachment paths.
    pub fn with_id_normalization(mut self, normalize: bool) -> Self {
        self.normalize_ids = normalize;
        self
    }

    /// Object node of the record.
    pub fn node(&self) -> &FieldNode {
        &self.object
    }

    /// File the record was parsed from.
    pub fn origin(&self) -> Option<&Path> {
        self.origin.as_deref()
    }

    /// Element at `path` below the object node.
    pub fn get(&self, path: impl Into<FieldPath>) -> Option<&FieldNode> {
        self.object.get(&path.into())
    }

    /// Vendor object number as exported, if non-blank.
    pub fn raw_id(&self) -> Option<&str> {
        self.object
            .text_at(&FieldPath::new([ADMIN_SECTION, EXTERNAL_ID_FIELD]))
            .map(str::trim)
            .filter(|id| !id.is_empty())
    }

    /// Store identifier, normalized unless disabled.
    pub fn id(&self) -> Option<ObjectId> {
        let raw = self.raw_id()?;
        if self.normalize_ids {
            Some(normalize_object_id(raw))
        } else {
            Some(raw.to_string())
        }
    }

    /// Delete when the action node carries `aktionart="DELETE"` (attribute or child element).
    pub fn action(&self) -> RecordAction {
        let Some(action) = self.object.get(&FieldPath::new([ADMIN_SECTION, ACTION_NODE])) else {
            return RecordAction::Upsert;
        };
        let kind = action
            .attribute(ACTION_KIND)
            .or_else(|| action.child(ACTION_KIND).map(FieldNode::text));
        match kind {
            Some(kind) if kind.trim() == DELETE_ACTION => RecordAction::Delete,
            _ => RecordAction::Upsert,
        }
    }

    /// Vendor-side modification date (`stand_vom`, ISO format).
    pub fn modified_on(&self) -> Option<NaiveDate> {
        let raw = self
            .object
            .text_at(&FieldPath::new([ADMIN_SECTION, MODIFIED_ON_FIELD]))?;
        NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d").ok()
    }

    /// First marketing type flagged `true` (`KAUF`, `MIETE_PACHT`, ...).
    pub fn marketing_type(&self) -> Option<&str> {
        self.first_true_attribute("objektkategorie/vermarktungsart")
    }

    /// Marketing type with its label.
    pub fn marketing_type_labeled(&self, labels: &dyn LabelMapper) -> Option<KeyLabel> {
        self.marketing_type().map(|key| labeled(key, labels))
    }

    /// True when the marketing type `kind` is flagged `true`.
    pub fn is_marketing_type(&self, kind: &str) -> bool {
        self.object
            .attribute_at(&"objektkategorie/vermarktungsart".into(), kind)
            == Some(BOOL_TRUE)
    }

    /// Offered for sale.
    pub fn is_for_sale(&self) -> bool {
        self.is_marketing_type(MARKETING_SALE)
    }

    /// Offered for rent or lease.
    pub fn is_for_rent(&self) -> bool {
        self.is_marketing_type(MARKETING_RENT)
    }

    /// First usage type flagged `true` (`WOHNEN`, `GEWERBE`, ...).
    pub fn usage_type(&self) -> Option<&str> {
        self.first_true_attribute("objektkategorie/nutzungsart")
    }

    /// Usage type with its label.
    pub fn usage_type_labeled(&self, labels: &dyn LabelMapper) -> Option<KeyLabel> {
        self.usage_type().map(|key| labeled(key, labels))
    }

    /// True when the usage type `kind` is flagged `true`.
    pub fn is_usage_type(&self, kind: &str) -> bool {
        self.object
            .attribute_at(&"objektkategorie/nutzungsart".into(), kind)
            == Some(BOOL_TRUE)
    }

    /// Address and coordinates from the `geo` section.
    pub fn location(&self) -> Location {
        let Some(geo) = self.object.child("geo") else {
            return Location::default();
        };
        let text = |name: &str| {
            geo.child(name)
                .map(|node| normalize_inline_whitespace(node.text()))
                .filter(|value| !value.is_empty())
        };
        let coordinate = |key: &str| {
            geo.attribute_at(&"geokoordinaten".into(), key)
                .and_then(|raw| raw.trim().parse::<f64>().ok())
        };
        Location {
            postal_code: text("plz"),
            city: text("ort"),
            street: text("strasse"),
            house_number: text("hausnummer"),
            country: geo
                .attribute_at(&"land".into(), "iso_land")
                .map(str::to_string),
            latitude: coordinate("breitengrad"),
            longitude: coordinate("laengengrad"),
        }
    }

    /// Object categories below `objektkategorie/objektart`, attribute values mapped.
    pub fn categories(&self, labels: &dyn LabelMapper) -> IndexMap<String, Category> {
        let Some(kinds) = self.get("objektkategorie/objektart") else {
            return IndexMap::new();
        };
        kinds
            .children()
            .iter()
            .map(|kind| {
                let detail = kind
                    .attributes()
                    .iter()
                    .map(|(attr, value)| (attr.clone(), labels.map_label(value)))
                    .collect();
                let category = Category {
                    key: kind.name().to_string(),
                    label: labels.map_label(kind.name()),
                    detail,
                };
                (kind.name().to_string(), category)
            })
            .collect()
    }

    /// Converted `preise` section.
    pub fn prices(&self, converter: &RecordConverter<'_>, without: &[&str]) -> ConvertedFields {
        self.convert_section("preise", converter, without)
    }

    /// Converted `ausstattung` section.
    pub fn features(&self, converter: &RecordConverter<'_>, without: &[&str]) -> ConvertedFields {
        self.convert_section("ausstattung", converter, without)
    }

    /// Converted `flaechen` section.
    ///
    /// Computed on first access and reused for the lifetime of this record;
    /// later calls ignore `converter`.
    pub fn area_figures(&self, converter: &RecordConverter<'_>) -> &ConvertedFields {
        self.area_figures
            .get_or_init(|| self.convert_section("flaechen", converter, &[]))
    }

    fn convert_section(
        &self,
        section: &str,
        converter: &RecordConverter<'_>,
        without: &[&str],
    ) -> ConvertedFields {
        match self.object.child(section) {
            Some(node) => converter.convert(node, without),
            None => ConvertedFields::new(),
        }
    }

    /// Heating types flagged `true`, mapped to labels.
    pub fn heating_types(&self, labels: &dyn LabelMapper) -> Vec<Label> {
        self.get("ausstattung/heizungsart")
            .map(|node| {
                node.attributes()
                    .iter()
                    .filter(|(_, value)| value.as_str() == BOOL_TRUE)
                    .map(|(key, _)| labels.map_label(key))
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Features from the highlight list that are flagged `true`, as labels.
    pub fn highlights(&self, labels: &dyn LabelMapper) -> Vec<Label> {
        let Some(features) = self.object.child("ausstattung") else {
            return Vec::new();
        };
        HIGHLIGHT_FEATURES
            .iter()
            .filter(|feature| features.child(feature).map(FieldNode::text) == Some(BOOL_TRUE))
            .map(|feature| labels.map_label(feature))
            .collect()
    }

    /// Attachments grouped by their `gruppe` attribute, in document order.
    pub fn attachments_grouped(&self, store_root: &str) -> IndexMap<String, Vec<Attachment>> {
        let mut grouped: IndexMap<String, Vec<Attachment>> = IndexMap::new();
        let (Some(attachments), Some(id)) = (self.object.child("anhaenge"), self.id()) else {
            return grouped;
        };
        for attachment in attachments.children_named("anhang") {
            let Some(pointer) = attachment
                .text_at(&"daten/pfad".into())
                .filter(|pointer| !pointer.is_empty())
            else {
                continue;
            };
            let group = attachment.attribute("gruppe").unwrap_or_default().to_string();
            let title = attachment
                .child("anhangtitel")
                .map(|node| node.text().to_string())
                .filter(|title| !title.is_empty());
            grouped.entry(group.clone()).or_default().push(Attachment {
                group,
                path: asset_display_path(store_root, &id, pointer),
                title,
            });
        }
        grouped
    }

    /// First attachment of the title image group.
    pub fn title_image(&self, store_root: &str) -> Option<Attachment> {
        self.attachments_grouped(store_root)
            .swap_remove(TITLE_IMAGE_GROUP)
            .and_then(|images| images.into_iter().next())
    }

    fn first_true_attribute(&self, path: &str) -> Option<&str> {
        self.get(path)?
            .attributes()
            .iter()
            .find(|(_, value)| value.as_str() == BOOL_TRUE)
            .map(|(key, _)| key.as_str())
    }
}

fn labeled(key: &str, labels: &dyn LabelMapper) -> KeyLabel {
    KeyLabel {
        key: key.to_string(),
        label: labels.map_label(key),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::format::FormatterResolver;
    use crate::labels::TextMap;

    const OBJECT_XML: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<openimmo>
  <anbieter>
    <immobilie>
      <objektkategorie>
        <nutzungsart WOHNEN="true" GEWERBE="false"/>
        <vermarktungsart KAUF="true" MIETE_PACHT="false"/>
        <objektart><haus haustyp="EINFAMILIENHAUS"/></objektart>
      </objektkategorie>
      <geo>
        <plz>01067</plz>
        <ort>Dresden</ort>
        <strasse>Altmarkt</strasse>
        <hausnummer>1</hausnummer>
        <geokoordinaten breitengrad="51.05" laengengrad="13.73"/>
        <land iso_land="DEU"/>
      </geo>
      <preise><kaufpreis>250000</kaufpreis></preise>
      <flaechen><wohnflaeche>123,00</wohnflaeche></flaechen>
      <ausstattung>
        <heizungsart OFEN="false" FUSSBODEN="true"/>
        <kamin>true</kamin>
        <sauna>false</sauna>
        <wintergarten>true</wintergarten>
      </ausstattung>
      <anhaenge>
        <anhang gruppe="BILD"><anhangtitel>Garten</anhangtitel><daten><pfad>garten.jpg</pfad></daten></anhang>
        <anhang gruppe="TITELBILD"><anhangtitel>Front</anhangtitel><daten><pfad>front.jpg</pfad></daten></anhang>
        <anhang gruppe="BILD"><daten><pfad>flur.jpg</pfad></daten></anhang>
      </anhaenge>
      <verwaltung_techn>
        <objektnr_extern>FF#4711</objektnr_extern>
        <aktion aktionart="CHANGE"/>
        <stand_vom>2024-01-31</stand_vom>
      </verwaltung_techn>
    </immobilie>
  </anbieter>
</openimmo>"#;

    fn record() -> Record {
        Record::parse(OBJECT_XML, Path::new("openimmo.xml")).unwrap()
    }

    #[test]
    fn identity_action_and_dates() {
        let record = record();
        assert_eq!(record.raw_id(), Some("FF#4711"));
        assert_eq!(record.id().as_deref(), Some("ff-4711"));
        assert_eq!(
            record.clone().with_id_normalization(false).id().as_deref(),
            Some("FF#4711")
        );
        assert_eq!(record.action(), RecordAction::Upsert);
        assert_eq!(record.modified_on(), NaiveDate::from_ymd_opt(2024, 1, 31));
        assert_eq!(record.origin(), Some(Path::new("openimmo.xml")));
    }

    #[test]
    fn delete_action_is_read_from_attribute_or_child() {
        let attr = OBJECT_XML.replace(r#"aktionart="CHANGE""#, r#"aktionart="DELETE""#);
        let record = Record::parse(&attr, Path::new("a.xml")).unwrap();
        assert_eq!(record.action(), RecordAction::Delete);

        let child = OBJECT_XML.replace(
            r#"<aktion aktionart="CHANGE"/>"#,
            "<aktion><aktionart>DELETE</aktionart></aktion>",
        );
        let record = Record::parse(&child, Path::new("b.xml")).unwrap();
        assert_eq!(record.action(), RecordAction::Delete);
    }

    #[test]
    fn missing_object_node_is_malformed() {
        let err = Record::parse("<openimmo><anbieter/></openimmo>", Path::new("x.xml"))
            .unwrap_err();
        assert!(matches!(
            err,
            StoreError::MalformedRecord { details, .. } if details.contains("anbieter/immobilie")
        ));
        let err = Record::parse("<openimmo>", Path::new("x.xml")).unwrap_err();
        assert!(matches!(err, StoreError::MalformedRecord { .. }));
    }

    #[test]
    fn marketing_and_usage_types() {
        let record = record();
        let labels = TextMap::from_entries([("KAUF", "Kauf")]);
        assert!(record.is_for_sale());
        assert!(!record.is_for_rent());
        assert_eq!(record.marketing_type(), Some("KAUF"));
        assert_eq!(
            record.marketing_type_labeled(&labels),
            Some(KeyLabel {
                key: "KAUF".into(),
                label: "Kauf".into()
            })
        );
        assert_eq!(record.usage_type(), Some("WOHNEN"));
        assert!(record.is_usage_type("WOHNEN"));
        assert_eq!(record.usage_type_labeled(&labels).unwrap().label, "WOHNEN");
    }

    #[test]
    fn location_keeps_postal_code_text() {
        let location = record().location();
        assert_eq!(location.postal_code.as_deref(), Some("01067"));
        assert_eq!(location.city.as_deref(), Some("Dresden"));
        assert_eq!(location.country.as_deref(), Some("DEU"));
        assert_eq!(location.latitude, Some(51.05));
        assert_eq!(location.longitude, Some(13.73));
    }

    #[test]
    fn open_decodes_latin1_markers() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("openimmo.xml");
        let mut xml = b"<?xml version=\"1.0\" encoding=\"ISO-8859-1\"?>\n\
            <openimmo><anbieter><immobilie><geo><ort>K\xF6ln</ort></geo>\
            <verwaltung_techn><objektnr_extern>M\xFCller-1</objektnr_extern></verwaltung_techn>\
            </immobilie></anbieter></openimmo>"
            .to_vec();
        fs::write(&path, &xml).unwrap();
        let record = Record::open(&path).unwrap();
        assert_eq!(record.location().city.as_deref(), Some("Köln"));
        assert_eq!(record.raw_id(), Some("Müller-1"));

        xml = OBJECT_XML.as_bytes().to_vec();
        fs::write(&path, &xml).unwrap();
        let record = Record::open(&path).unwrap();
        assert_eq!(record.location().city.as_deref(), Some("Dresden"));
    }

    #[test]
    fn categories_map_attribute_values() {
        let labels = TextMap::from_entries([("haus", "Haus"), ("EINFAMILIENHAUS", "Einfamilienhaus")]);
        let categories = record().categories(&labels);
        let house = &categories["haus"];
        assert_eq!(house.label, "Haus");
        assert_eq!(house.detail["haustyp"], "Einfamilienhaus");
    }

    #[test]
    fn sections_convert_through_the_converter() {
        let labels = TextMap::new();
        let resolver = FormatterResolver::default();
        let converter = RecordConverter::new(&labels, &resolver);
        let record = record();

        let prices = record.prices(&converter, &[]);
        assert_eq!(prices["kaufpreis"].value.as_text(), Some("250.000,00 €"));

        let features = record.features(&converter, &["heizungsart"]);
        assert_eq!(features.len(), 3);
        assert_eq!(features["kamin"].value.as_bool(), Some(true));

        let areas = record.area_figures(&converter);
        assert_eq!(areas["wohnflaeche"].value.as_text(), Some("123 m²"));
        let again = record.area_figures(&converter);
        assert!(std::ptr::eq(areas, again));
    }

    #[test]
    fn heating_types_and_highlights() {
        let labels = TextMap::from_entries([("kamin", "Kamin"), ("FUSSBODEN", "Fußboden")]);
        let record = record();
        assert_eq!(record.heating_types(&labels), ["Fußboden"]);
        assert_eq!(record.highlights(&labels), ["Kamin", "wintergarten"]);
    }

    #[test]
    fn attachments_group_and_title_image() {
        let record = record();
        let grouped = record.attachments_grouped("./store");
        assert_eq!(grouped.keys().collect::<Vec<_>>(), ["BILD", "TITELBILD"]);
        assert_eq!(grouped["BILD"].len(), 2);
        assert_eq!(grouped["BILD"][0].path, "/store/ff-4711/garten.jpg");
        assert_eq!(grouped["BILD"][1].title, None);

        let title = record.title_image("./store").unwrap();
        assert_eq!(title.path, "/store/ff-4711/front.jpg");
        assert_eq!(title.title.as_deref(), Some("Front"));
    }

    #[test]
    fn generic_path_lookup() {
        let record = record();
        assert_eq!(record.get("geo/ort").map(FieldNode::text), Some("Dresden"));
        assert!(record.get("geo/nope").is_none());
    }
}
