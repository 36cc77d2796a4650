//! Header names of the catalog CSV schema.

pub const LATITUDE: &str = "polozenie_szerokosc";
pub const LONGITUDE: &str = "polozenie_dlugosc";
pub const OBJECT_NAME: &str = "obiekt";
pub const LOCALITY_PL: &str = "nazwa_geograficzna_polska";
pub const LOCALITY_FOREIGN: &str = "nazwa_geograficzna_obca";
pub const REGION: &str = "wojewodztwo";
pub const COUNTY: &str = "powiat";
pub const LOCATION: &str = "lokalizacja";
pub const OBJECT_TYPE: &str = "typ_obiektu";
pub const MATERIAL: &str = "material";
pub const HEIGHT: &str = "wysokosc";
pub const WIDTH: &str = "szerokosc";
pub const DESCRIPTION: &str = "opis";
pub const INSCRIPTION: &str = "inskrypcja";
pub const SCRIPT_TYPE: &str = "typ_pisma";
pub const TRANSLATION: &str = "tlumaczenie";
pub const HERALDRY: &str = "herby";
pub const GENEALOGY: &str = "genealogia";
pub const BIBLIOGRAPHY: &str = "bibliografia";
pub const SOURCE_REFERENCES: &str = "odsylacze_do_zrodla";
pub const ENTRY_AUTHORS: &str = "autorzy_wpisu";
pub const ENTRY_DATE: &str = "data_wpisu";
pub const CORRECTION_1_AUTHOR: &str = "korekta_nr_1_autor";
pub const CORRECTION_1_DATE: &str = "data_korekty_1";
pub const CORRECTION_2_AUTHOR: &str = "korekta_nr_2_autor";
pub const CORRECTION_2_DATE: &str = "data_korekty_2";
pub const COMMEMORATED_PERSON: &str = "imie_nazwisko_osoby_upamietnionej";
pub const SCAN_3D: &str = "skan_3d";
pub const STATUS: &str = "status";

/// Columns that must hold a value for a row to be importable.
pub const REQUIRED: [&str; 2] = [LOCALITY_PL, OBJECT_TYPE];
