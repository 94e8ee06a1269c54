//! Species classification (C6): sorting a chemistry mechanism's variable
//! names into the ones that actually move through an aperture, versus
//! reaction rates, surface concentrations, and other mechanism bookkeeping
//! that never leaves a room.

/// Variables that never transport: surface deposits, photolysis/reaction
/// rates, yields, deposition velocities, and named physical constants —
/// none of these describe a bulk gas concentration.
const RESERVED_EXACT: &[&str] = &[
    "ACRate", "cosx", "secx", "M", "temp", "H2O", "PI", "AV", "adults", "children", "O2", "N2",
    "H2", "saero", "OH_reactivity", "OH_production", "KDI", "K8I", "FC9", "NC13", "NCD", "FC12",
    "KMT14", "CNO3", "KMT05", "F17", "K140", "KFPAN", "KPPNI", "K20", "KMT06", "KCH3O2", "K7I",
    "NC14", "NCPPN", "F3", "K10I", "KRD", "KR10", "NC1", "K3I", "NC17", "K12I", "NC4", "K14I",
    "K150", "K200", "F20", "KMT16", "K160", "F19", "KR7", "FC2", "F16", "N19", "KR3", "KMT20",
    "KHOCL", "F13", "KC0", "KMT04", "KRPPN", "F9", "K130", "KMT10", "KR19", "KMT02", "K4I",
    "KMT01", "FC14", "KR14", "NC7", "K170", "KBPPN", "K190", "NC3", "K15I", "KR15", "KCI",
    "FCPPN", "F15", "FC4", "KR12", "KMT17", "KR13", "K298CH3O2", "K80", "KMT19", "FC15", "K90",
    "K17I", "NC", "K20I", "F4", "K4", "N20", "KNO3AL", "KROSEC", "KNO3", "CCLNO3", "K70", "F8",
    "KRO2HO2", "FC20", "K14ISOM1", "KMT09", "FC16", "FPPN", "KROPRIM", "F12", "K19I", "NC8",
    "FCD", "KRO2NO3", "KMT18", "NC12", "KMT07", "FC3", "KRC", "F1", "FCC", "KR16", "CCLHO",
    "KMT13", "F10", "K100", "K40", "KCLNO3", "FC7", "F7", "FC", "NC10", "KR2", "FC17", "CN2O5",
    "KR4", "FC8", "KMT11", "KMT15", "KAPNO", "K1I", "KBPAN", "NC9", "FC19", "KMT03", "K3", "K16I",
    "KR20", "KPPN0", "F2", "K10", "FC1", "KR1", "KMT08", "KAPHO2", "KMT12", "F14", "KR17", "FC13",
    "KR8", "K2I", "K2", "FC10", "KDEC", "KD0", "NC16", "K13I", "KR9", "KN2O5", "K30", "K1", "K9I",
    "KRO2NO", "K120", "FD", "NC2", "NC15",
];

/// Whether `name` matches one of the non-transportable regex families:
/// `.+SURF$`, `^J\d+`, `^YIELD.+`, `^AV.+`, `^vd.+`, `^r\d+`.
fn matches_reserved_pattern(name: &str) -> bool {
    if name.ends_with("SURF") && name.len() > 4 {
        return true;
    }
    if starts_with_then_digits(name, "J") {
        return true;
    }
    if name.starts_with("YIELD") && name.len() > 5 {
        return true;
    }
    if name.starts_with("AV") && name.len() > 2 {
        return true;
    }
    if name.starts_with("vd") && name.len() > 2 {
        return true;
    }
    if starts_with_then_digits(name, "r") {
        return true;
    }
    false
}

/// `^prefix\d+`: `prefix` followed by one or more ASCII digits.
fn starts_with_then_digits(name: &str, prefix: &str) -> bool {
    match name.strip_prefix(prefix) {
        Some(rest) => !rest.is_empty() && rest.chars().next().unwrap().is_ascii_digit(),
        None => false,
    }
}

/// `.*OUT$`: any name ending in the literal outdoor-sidecar suffix.
fn matches_outdoor_pattern(name: &str) -> bool {
    name.ends_with("OUT")
}

/// How one mechanism variable classifies for transport purposes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum SpeciesClass {
    /// A real indoor concentration, transported between rooms and to/from
    /// outside.
    Indoor,
    /// An outdoor-sidecar variable (`"<species>OUT"`) holding the ambient
    /// value of some indoor species; never itself transported, but read to
    /// supply `indoor_species_name` at the building boundary.
    OutdoorSidecar,
    /// Reaction rate, surface concentration, yield, or named constant —
    /// stays local to the room's chemistry solver.
    Reserved,
}

/// Classify one mechanism variable name.
pub fn classify(name: &str) -> SpeciesClass {
    if matches_reserved_pattern(name) || RESERVED_EXACT.contains(&name) {
        return SpeciesClass::Reserved;
    }
    if matches_outdoor_pattern(name) {
        return SpeciesClass::OutdoorSidecar;
    }
    SpeciesClass::Indoor
}

/// For an outdoor-sidecar variable like `"O3OUT"`, the indoor species name
/// it shadows (`"O3"`). Returns `None` if `name` is not itself a sidecar.
pub fn indoor_species_name(name: &str) -> Option<&str> {
    name.strip_suffix("OUT")
}

/// Split a full variable list into the indoor and outdoor-sidecar subsets,
/// in their original relative order, discarding everything reserved.
pub fn split_transportable(all_vars: &[String]) -> (Vec<String>, Vec<String>) {
    let mut indoor = Vec::new();
    let mut outdoor = Vec::new();
    for name in all_vars {
        match classify(name) {
            SpeciesClass::Indoor => indoor.push(name.clone()),
            SpeciesClass::OutdoorSidecar => outdoor.push(name.clone()),
            SpeciesClass::Reserved => {}
        }
    }
    (indoor, outdoor)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn surf_suffix_is_reserved() {
        assert_eq!(classify("O3SURF"), SpeciesClass::Reserved);
    }

    #[test]
    fn photolysis_rate_is_reserved() {
        assert_eq!(classify("J41"), SpeciesClass::Reserved);
    }

    #[test]
    fn yield_prefix_is_reserved() {
        assert_eq!(classify("YIELDWOOD"), SpeciesClass::Reserved);
    }

    #[test]
    fn reaction_rate_is_reserved() {
        assert_eq!(classify("r123"), SpeciesClass::Reserved);
        // bare "r" with no digits is not a reaction rate
        assert_eq!(classify("r"), SpeciesClass::Indoor);
    }

    #[test]
    fn named_constant_is_reserved() {
        assert_eq!(classify("KMT05"), SpeciesClass::Reserved);
        assert_eq!(classify("O2"), SpeciesClass::Reserved);
    }

    #[test]
    fn out_suffix_is_outdoor_sidecar_unless_reserved_first() {
        assert_eq!(classify("O3OUT"), SpeciesClass::OutdoorSidecar);
        assert_eq!(indoor_species_name("O3OUT"), Some("O3"));
        // AVOUT hits the ^AV.+ reserved pattern before the outdoor check
        assert_eq!(classify("AVOUT"), SpeciesClass::Reserved);
    }

    #[test]
    fn ordinary_species_is_indoor() {
        assert_eq!(classify("APINENE"), SpeciesClass::Indoor);
    }

    #[test]
    fn split_transportable_partitions_and_preserves_order() {
        let vars: Vec<String> = vec!["APINENE", "O3OUT", "J41", "LIMONENE", "O2"]
            .into_iter()
            .map(String::from)
            .collect();
        let (indoor, outdoor) = split_transportable(&vars);
        assert_eq!(indoor, vec!["APINENE", "LIMONENE"]);
        assert_eq!(outdoor, vec!["O3OUT"]);
    }
}
