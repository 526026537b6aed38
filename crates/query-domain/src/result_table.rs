// result_table.rs
use crate::DomainError;
use sha2::{Digest, Sha256};
use uuid::Uuid;

/// Tabla de resultados tal como la devuelve el driver: nombres de columnas y
/// filas de valores en texto (`None` = NULL).
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ResultTable {
  columns: Vec<String>,
  rows: Vec<Vec<Option<String>>>,
}

impl ResultTable {
  pub fn new(columns: Vec<String>) -> Self {
    Self { columns, rows: Vec::new() }
  }

  /// Agrega una fila. Debe tener exactamente una celda por columna.
  pub fn push_row(&mut self, row: Vec<Option<String>>) -> Result<(), DomainError> {
    if row.len() != self.columns.len() {
      return Err(DomainError::ValidationError(format!("la fila tiene {} valores pero hay {} columnas",
                                                      row.len(),
                                                      self.columns.len())));
    }
    self.rows.push(row);
    Ok(())
  }

  pub fn columns(&self) -> &[String] {
    &self.columns
  }

  pub fn rows(&self) -> &[Vec<Option<String>>] {
    &self.rows
  }

  /// Serializa a CSV: cabecera con los nombres de columna, NULL como campo
  /// vacío, comillas sólo cuando el campo contiene coma, comilla o salto de
  /// línea (las comillas internas se duplican) y `\n` como terminador.
  pub fn to_csv(&self) -> Result<ResultArtifact, DomainError> {
    let mut writer = csv::WriterBuilder::new().terminator(csv::Terminator::Any(b'\n'))
                                              .quote_style(csv::QuoteStyle::Necessary)
                                              .from_writer(Vec::new());
    if !self.columns.is_empty() {
      writer.write_record(&self.columns)?;
      for row in &self.rows {
        writer.write_record(row.iter().map(|c| c.as_deref().unwrap_or("")))?;
      }
    }
    let bytes = writer.into_inner()
                      .map_err(|e| DomainError::SerializationError(e.to_string()))?;
    let csv = String::from_utf8(bytes).map_err(|e| DomainError::SerializationError(e.to_string()))?;
    Ok(ResultArtifact::new(csv, self.rows.len()))
  }
}

/// Artefacto CSV producido al ejecutar el SQL y consumido al publicar.
/// El coordinador no lo inspecciona: sólo lo pasa de un paso al siguiente.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResultArtifact {
  csv: String,
  row_count: usize,
  sha256: String,
}

impl ResultArtifact {
  pub fn new(csv: String, row_count: usize) -> Self {
    let sha256 = format!("{:x}", Sha256::digest(csv.as_bytes()));
    Self { csv, row_count, sha256 }
  }

  pub fn csv(&self) -> &str {
    &self.csv
  }

  pub fn as_bytes(&self) -> &[u8] {
    self.csv.as_bytes()
  }

  pub fn len(&self) -> usize {
    self.csv.len()
  }

  pub fn is_empty(&self) -> bool {
    self.csv.is_empty()
  }

  /// Filas de datos (sin contar la cabecera).
  pub fn row_count(&self) -> usize {
    self.row_count
  }

  /// Hash SHA-256 en hex del contenido; se adjunta como metadata del blob.
  pub fn sha256(&self) -> &str {
    &self.sha256
  }
}

/// Nombre único del blob para un artefacto: `file_<uuid>.csv`.
pub fn artifact_file_name(id: Uuid) -> String {
  format!("file_{}.csv", id)
}

#[cfg(test)]
mod tests {
  use super::*;

  fn cell(s: &str) -> Option<String> {
    Some(s.to_string())
  }

  #[test]
  fn comma_inside_field_forces_quoting() {
    let mut t = ResultTable::new(vec!["id".into(), "name".into()]);
    t.push_row(vec![cell("1"), cell("a")]).unwrap();
    t.push_row(vec![cell("2"), cell("b, c")]).unwrap();
    let artifact = t.to_csv().unwrap();
    assert_eq!(artifact.csv(), "id,name\n1,a\n2,\"b, c\"\n");
    assert_eq!(artifact.row_count(), 2);
  }

  #[test]
  fn quotes_are_doubled_and_newlines_quoted() {
    let mut t = ResultTable::new(vec!["note".into(), "n".into()]);
    t.push_row(vec![cell("say \"hi\""), cell("1")]).unwrap();
    t.push_row(vec![cell("two\nlines"), None]).unwrap();
    let csv = t.to_csv().unwrap();
    assert_eq!(csv.csv(), "note,n\n\"say \"\"hi\"\"\",1\n\"two\nlines\",\n");
  }

  #[test]
  fn empty_result_keeps_header() {
    let t = ResultTable::new(vec!["id".into(), "name".into()]);
    assert_eq!(t.to_csv().unwrap().csv(), "id,name\n");
  }

  #[test]
  fn statement_without_columns_yields_empty_artifact() {
    let t = ResultTable::default();
    let artifact = t.to_csv().unwrap();
    assert!(artifact.is_empty());
    assert_eq!(artifact.row_count(), 0);
  }

  #[test]
  fn row_width_is_validated() {
    let mut t = ResultTable::new(vec!["id".into()]);
    let err = t.push_row(vec![cell("1"), cell("2")]).unwrap_err();
    assert!(matches!(err, DomainError::ValidationError(_)));
  }

  #[test]
  fn artifact_hash_is_stable() {
    let a = ResultArtifact::new("id\n1\n".into(), 1);
    let b = ResultArtifact::new("id\n1\n".into(), 1);
    assert_eq!(a.sha256(), b.sha256());
    assert_eq!(a.sha256().len(), 64);
  }

  #[test]
  fn file_name_embeds_uuid() {
    let id = Uuid::new_v4();
    let name = artifact_file_name(id);
    assert!(name.starts_with("file_") && name.ends_with(".csv"));
    assert!(name.contains(&id.to_string()));
  }
}
