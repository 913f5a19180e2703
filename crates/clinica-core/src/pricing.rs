//! Price lookup in the tarifa table.

use rust_decimal::Decimal;

use crate::models::reference::Tarifa;

/// Price configured for a (study, insurer) pair.
///
/// `None` means "no tariff configured" (or an id is still unresolved) and
/// must never be read as a zero price.
pub fn resolve(study_id: &str, obra_social_id: &str, table: &[Tarifa]) -> Option<Decimal> {
    if study_id.is_empty() || obra_social_id.is_empty() {
        return None;
    }

    table
        .iter()
        .find(|t| t.estudio_id == study_id && t.obra_social_id == obra_social_id)
        .map(|t| t.precio)
}
