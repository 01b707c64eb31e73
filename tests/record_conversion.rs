use std::path::Path;
use std::sync::Arc;
use std::thread;

use openimmo_store::format::{PriceFormatter, SquareMeters, Suffix, TrimDecimals};
use openimmo_store::labels::title_case;
use openimmo_store::{
    FieldValue, FormatterResolver, FormatterRules, LabelFallback, Record, RecordConverter, TextMap,
};

const EXPORT: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<openimmo xmlns="http://www.openimmo.de">
  <anbieter>
    <immobilie>
      <preise>
        <kaufpreis>250000</kaufpreis>
        <nebenkosten>180.5</nebenkosten>
        <kaufpreis_auf_anfrage>true</kaufpreis_auf_anfrage>
        <waehrung iso_waehrung="EUR"/>
      </preise>
      <flaechen>
        <wohnflaeche>123,00</wohnflaeche>
        <grundstuecksflaeche>640.75</grundstuecksflaeche>
        <anzahl_zimmer>4</anzahl_zimmer>
      </flaechen>
      <verwaltung_techn><objektnr_extern>FF#12</objektnr_extern></verwaltung_techn>
    </immobilie>
  </anbieter>
</openimmo>"#;

fn record() -> Record {
    Record::parse(EXPORT, Path::new("openimmo.xml")).unwrap()
}

#[test]
fn default_rules_format_prices_and_areas() {
    let labels = TextMap::from_entries([("kaufpreis", "Kaufpreis"), ("wohnflaeche", "")])
        .with_fallback(LabelFallback::TitleCase);
    let resolver = FormatterResolver::default();
    let converter = RecordConverter::new(&labels, &resolver);
    let record = record();

    let prices = record.prices(&converter, &[]);
    assert_eq!(prices["kaufpreis"].label, "Kaufpreis");
    assert_eq!(prices["kaufpreis"].value.as_text(), Some("250.000,00 €"));
    assert_eq!(prices["kaufpreis"].original.as_deref(), Some("250000"));
    assert_eq!(prices["nebenkosten"].value.as_text(), Some("180,50 €"));
    assert_eq!(prices["kaufpreis_auf_anfrage"].value, FieldValue::Bool(true));
    let currency = prices["waehrung"].value.as_attributes().unwrap();
    assert_eq!(currency["iso_waehrung"].value.as_text(), Some("EUR"));

    let areas = record.area_figures(&converter);
    assert_eq!(areas["wohnflaeche"].label, title_case("wohnflaeche"));
    assert_eq!(areas["wohnflaeche"].value.as_text(), Some("123 m²"));
    assert_eq!(areas["grundstuecksflaeche"].value.as_text(), Some("640 m²"));
    assert_eq!(areas["anzahl_zimmer"].value.as_text(), Some("4"));
    assert_eq!(areas["anzahl_zimmer"].original, None);

    assert_eq!(resolver.unformatted_keys(), ["iso_waehrung", "anzahl_zimmer"]);
}

#[test]
fn custom_rules_run_in_declaration_order() {
    let labels = TextMap::new();
    let resolver = FormatterResolver::new(
        FormatterRules::new()
            .rule(["anzahl_zimmer"], Suffix::new(" Zimmer"))
            .rule(["*flaeche"], TrimDecimals)
            .rule(["*flaeche"], SquareMeters)
            .rule(["*preis"], PriceFormatter),
    );
    let converter = RecordConverter::new(&labels, &resolver);
    let record = record();

    let areas = converter.convert(record.get("flaechen").unwrap(), &["grundstuecksflaeche"]);
    assert_eq!(
        areas.keys().map(String::as_str).collect::<Vec<_>>(),
        ["wohnflaeche", "anzahl_zimmer"]
    );
    assert_eq!(areas["anzahl_zimmer"].value.as_text(), Some("4 Zimmer"));
    assert_eq!(
        resolver.resolve("wohnflaeche").names(),
        ["trim_decimals", "square_meters"]
    );
}

#[test]
fn converted_output_serializes_for_templates() {
    let labels = TextMap::new();
    let resolver = FormatterResolver::default();
    let converter = RecordConverter::new(&labels, &resolver);
    let json = serde_json::to_value(record().prices(&converter, &["waehrung"])).unwrap();
    assert_eq!(json["kaufpreis"]["label"], "kaufpreis");
    assert_eq!(json["kaufpreis"]["value"], "250.000,00 €");
    assert_eq!(json["kaufpreis_auf_anfrage"]["value"], true);
    assert!(json.get("waehrung").is_none());
}

#[test]
fn shared_resolver_memoizes_across_threads() {
    let resolver = Arc::new(FormatterResolver::default());
    let handles: Vec<_> = (0..4)
        .map(|_| {
            let resolver = Arc::clone(&resolver);
            thread::spawn(move || {
                let labels = TextMap::new();
                let converter = RecordConverter::new(&labels, &resolver);
                record().area_figures(&converter)["wohnflaeche"].value.clone()
            })
        })
        .collect();
    for handle in handles {
        assert_eq!(handle.join().unwrap().as_text(), Some("123 m²"));
    }
    assert_eq!(resolver.unformatted_keys(), ["anzahl_zimmer"]);
    assert_eq!(resolver.cached_key_count(), 3);
}
