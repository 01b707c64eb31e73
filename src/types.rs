/// Normalized object identifier used to key store directories and index entries.
/// Example: `ff-4711-abc`
pub type ObjectId = String;
/// Raw field name from the record's field tree.
/// Examples: `kaufpreis`, `wohnflaeche`, `kamin`
pub type FieldKey = String;
/// Human-readable label produced by a label mapper.
/// Examples: `Kaufpreis`, `Wohnfläche`
pub type Label = String;
/// Ordering token embedded in an archive file name.
/// Example: `20240131120000` for `openimmo20240131120000.zip`
pub type TokenString = String;
/// Store-relative path strings persisted in the index.
/// Example: `ff-4711-abc/openimmo.xml`
pub type RelPathString = String;
/// Display path of an attachment built from store root, identifier, and pointer.
/// Example: `/data/extracted/ff-4711-abc/images/front.jpg`
pub type AssetPath = String;
