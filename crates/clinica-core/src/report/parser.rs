//! Rule-based parser for surgical report text.

use regex::{Regex, RegexBuilder};
use tracing::{debug, trace};

use crate::error::ConfigError;
use crate::models::document::ParsedDocument;

use super::patterns::{NarrativeRule, PatternTable, EXCESS_BLANK_LINES};

/// Surgical report parser compiled from a [`PatternTable`].
///
/// Parsing never fails: a field no pattern recovers is left empty.
#[derive(Debug, Clone)]
pub struct ReportParser {
    patient_name: Vec<Regex>,
    insurance: Vec<Regex>,
    age: Vec<Regex>,
    surgeon: Vec<Regex>,
    practice: Vec<Regex>,
    date: Vec<Regex>,
    operation: Regex,
}

impl ReportParser {
    /// Compile every pattern of the table.
    pub fn from_table(table: &PatternTable) -> Result<Self, ConfigError> {
        Ok(Self {
            patient_name: compile_all("patient_name", &table.patient_name)?,
            insurance: compile_all("insurance", &table.insurance)?,
            age: compile_all("age", &table.age)?,
            surgeon: compile_all("surgeon", &table.surgeon)?,
            practice: compile_all("practice", &table.practice)?,
            date: compile_all("date", &table.date)?,
            operation: compile_narrative(&table.operation)?,
        })
    }

    /// Parse raw document text into fields.
    pub fn parse(&self, text: &str) -> ParsedDocument {
        let normalized = normalize(text);

        let parsed = ParsedDocument {
            patient_name: first_capture(&self.patient_name, &normalized),
            insurance: first_capture(&self.insurance, &normalized),
            age: first_capture(&self.age, &normalized),
            surgeon: first_capture(&self.surgeon, &normalized),
            practice: first_capture(&self.practice, &normalized),
            date: first_capture(&self.date, &normalized),
            operation_description: first_capture(std::slice::from_ref(&self.operation), &normalized),
            raw_text: normalized,
        };

        debug!(
            "Parsed {} chars of report text, missing fields: {:?}",
            parsed.raw_text.len(),
            parsed.missing_fields()
        );

        parsed
    }
}

impl Default for ReportParser {
    fn default() -> Self {
        super::patterns::DEFAULT_PARSER.clone()
    }
}

/// Unify line endings and squeeze runs of blank lines down to one.
pub fn normalize(text: &str) -> String {
    let unified = text.replace("\r\n", "\n").replace('\r', "\n");
    EXCESS_BLANK_LINES.replace_all(&unified, "\n\n").into_owned()
}

fn first_capture(patterns: &[Regex], text: &str) -> String {
    for (i, pattern) in patterns.iter().enumerate() {
        let value = pattern
            .captures(text)
            .and_then(|caps| caps.get(1))
            .map(|m| m.as_str().trim())
            .unwrap_or_default();

        if !value.is_empty() {
            trace!("Pattern #{} matched: {:?}", i, value);
            return value.to_string();
        }
    }
    String::new()
}

fn compile_all(field: &str, patterns: &[String]) -> Result<Vec<Regex>, ConfigError> {
    patterns.iter().map(|p| compile(field, p)).collect()
}

fn compile(field: &str, pattern: &str) -> Result<Regex, ConfigError> {
    let invalid = |reason: String| ConfigError::InvalidPattern {
        field: field.to_string(),
        pattern: pattern.to_string(),
        reason,
    };

    let regex = RegexBuilder::new(pattern)
        .case_insensitive(true)
        .build()
        .map_err(|e| invalid(e.to_string()))?;

    if regex.captures_len() < 2 {
        return Err(invalid("pattern has no capture group".to_string()));
    }

    Ok(regex)
}

fn compile_narrative(rule: &NarrativeRule) -> Result<Regex, ConfigError> {
    let mut stops: Vec<String> = rule
        .terminators
        .iter()
        .filter(|t| !t.is_empty())
        .map(|t| format!("(?:{})", t))
        .collect();
    stops.extend(
        rule.signers
            .iter()
            .filter(|s| !s.trim().is_empty())
            .map(|s| regex::escape(s.trim())),
    );
    stops.push("$".to_string());

    let pattern = format!(r"(?:{})([\s\S]+?)(?:{})", rule.header, stops.join("|"));
    compile("operation", &pattern)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const REPORT: &str = "PARTE QUIRURGICO\r\n\
        Apellido y Nombre: GOMEZ, ANA MARIA O. Social: OSDE 210 Edad: 54\r\n\
        Fecha: 12/03/2024\r\n\
        Cirujano: PEREZ JUAN 1° Ayudante: LOPEZ\r\n\
        PRACTICA: COLECISTECTOMIA LAPAROSCOPICA\r\n\
        \r\n\r\n\r\n\
        DESCRIPCION DE LA OPERACION\r\n\
        Neumoperitoneo con aguja de Veress.\r\n\
        Se extrae vesicula sin complicaciones.\r\n\
        M.N. 12345\r\n";

    fn parser() -> ReportParser {
        ReportParser::default()
    }

    #[test]
    fn test_parse_full_report() {
        let parsed = parser().parse(REPORT);

        assert_eq!(parsed.patient_name, "GOMEZ, ANA MARIA");
        // The plan number is outside the insurer name class, so the broad fallback wins.
        assert_eq!(parsed.insurance, "OSDE 210");
        assert_eq!(parsed.age, "54");
        assert_eq!(parsed.surgeon, "PEREZ JUAN");
        assert_eq!(parsed.practice, "COLECISTECTOMIA LAPAROSCOPICA");
        assert_eq!(parsed.date, "12/03/2024");
        assert_eq!(
            parsed.operation_description,
            "Neumoperitoneo con aguja de Veress.\nSe extrae vesicula sin complicaciones."
        );
    }

    #[test]
    fn test_scenario_insurance_and_age() {
        let parsed = parser().parse("O Social: OSDE Binario\nEdad 54");
        assert_eq!(parsed.insurance, "OSDE Binario");
        assert_eq!(parsed.age, "54");
    }

    #[test]
    fn test_age_needs_colon_or_whitespace() {
        assert_eq!(parser().parse("Edad :  7 años").age, "7");
        assert_eq!(parser().parse("Edad\t81").age, "81");
        assert_eq!(parser().parse("Edad-54").age, "");
        assert_eq!(parser().parse("Edad: 1234").age, "123");
    }

    #[test]
    fn test_insurance_ocr_variants() {
        assert_eq!(parser().parse("0. Social: IOMA\n").insurance, "IOMA");
        assert_eq!(parser().parse("O.Social: PAMI Camet 123").insurance, "PAMI");
        assert_eq!(parser().parse("Obra Social: SWISS MEDICAL 1234567").insurance, "SWISS MEDICAL");
        assert_eq!(parser().parse("O. Soc: OSDE-310\nEdad 3").insurance, "OSDE-310");
    }

    #[test]
    fn test_insurance_fallback_accepts_any_chars() {
        // Only the broad fallback tolerates a mangled label.
        let parsed = parser().parse("O. Sociales: 4PLAN SALUD\n");
        assert_eq!(parsed.insurance, "4PLAN SALUD");
    }

    #[test]
    fn test_normalize_line_endings_and_blank_lines() {
        assert_eq!(normalize("a\r\nb\rc\n\n\n\n\nd"), "a\nb\nc\n\nd");
        assert_eq!(normalize("a\n\nb"), "a\n\nb");
        assert_eq!(parser().parse("x\r\n\r\n\r\ny").raw_text, "x\n\ny");
    }

    #[test]
    fn test_missing_field_does_not_affect_others() {
        let text = "Apellido y Nombre: RUIZ PEDRO\nCirujano: DIAZ LUIS\nFecha: 1/2/24\n";
        let parsed = parser().parse(text);

        assert_eq!(parsed.patient_name, "RUIZ PEDRO");
        assert_eq!(parsed.surgeon, "DIAZ LUIS");
        assert_eq!(parsed.date, "1/2/24");
        assert_eq!(parsed.age, "");
        assert_eq!(parsed.insurance, "");
        assert_eq!(parsed.practice, "");
        assert_eq!(parsed.operation_description, "");
    }

    #[test]
    fn test_empty_text_yields_empty_fields() {
        let parsed = parser().parse("");
        assert_eq!(parsed, ParsedDocument::default());
    }

    #[test]
    fn test_parse_is_deterministic() {
        let p = parser();
        assert_eq!(p.parse(REPORT), p.parse(REPORT));
    }

    #[test]
    fn test_date_fallbacks() {
        assert_eq!(parser().parse("Fecha: 2024-03-12").date, "2024-03-12");
        assert_eq!(parser().parse("Fecha 5 / 6 / 2023").date, "5 / 6 / 2023");
        assert_eq!(parser().parse("realizado el 07/11/2023 en quirofano").date, "07/11/2023");
    }

    #[test]
    fn test_practice_with_accent_and_next_label() {
        let parsed = parser().parse("Práctica: HERNIOPLASTIA INGUINAL\nANESTESIA GENERAL");
        assert_eq!(parsed.practice, "HERNIOPLASTIA INGUINAL");
    }

    #[test]
    fn test_narrative_stops_at_signer_and_runs_to_end() {
        let signed = "DESCRIPCION DE LA OPERACIÓN\nIncision mediana.\nDr. ALVARRACIN";
        assert_eq!(parser().parse(signed).operation_description, "Incision mediana.\nDr.");

        let unsigned = "DESCRIPCIÓN DE LA OPERACION\nCierre por planos.\n";
        assert_eq!(parser().parse(unsigned).operation_description, "Cierre por planos.");
    }

    #[test]
    fn test_custom_table_and_invalid_pattern() {
        let mut table = PatternTable::default();
        table.age = vec![r"Años\s*(\d+)".to_string()];
        let custom = ReportParser::from_table(&table).unwrap();
        assert_eq!(custom.parse("Años 33").age, "33");

        table.surgeon = vec!["Cirujano (".to_string()];
        match ReportParser::from_table(&table) {
            Err(ConfigError::InvalidPattern { field, .. }) => assert_eq!(field, "surgeon"),
            other => panic!("expected invalid pattern error, got {:?}", other.map(|_| ())),
        }

        table.surgeon = vec!["Cirujano".to_string()];
        assert!(matches!(
            ReportParser::from_table(&table),
            Err(ConfigError::InvalidPattern { .. })
        ));
    }
}
