// prompt.rs
use crate::DomainError;

const HEADER: &str = "### Postgres SQL tables, with their properties:";
const QUERY_PREFIX: &str = "### A query to ";
/// Token final: el servicio de completions continúa directamente con el
/// cuerpo del SELECT.
pub const PRIMING_TOKEN: &str = "SELECT";

/// Prompt de completions construido a partir de las líneas de descripción
/// del esquema guardadas en la base de datos.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SchemaPrompt {
  schema_lines: Vec<String>,
}

impl SchemaPrompt {
  pub fn new(schema_lines: Vec<String>) -> Self {
    Self { schema_lines }
  }

  pub fn schema_lines(&self) -> &[String] {
    &self.schema_lines
  }

  /// Genera el prompt para `text_query`:
  ///
  /// ```text
  /// ### Postgres SQL tables, with their properties:
  /// #
  /// # <línea de esquema>
  /// #
  /// ### A query to <texto>
  /// SELECT
  /// ```
  pub fn render(&self, text_query: &str) -> Result<String, DomainError> {
    let text = text_query.trim();
    if text.is_empty() {
      return Err(DomainError::ValidationError("el texto de la consulta está vacío".into()));
    }
    let mut out = String::with_capacity(128 + self.schema_lines.iter().map(|l| l.len() + 3).sum::<usize>());
    out.push_str(HEADER);
    out.push_str("\n#\n");
    for line in &self.schema_lines {
      out.push_str("# ");
      out.push_str(line);
      out.push('\n');
    }
    out.push_str("#\n");
    out.push_str(QUERY_PREFIX);
    out.push_str(text);
    out.push('\n');
    out.push_str(PRIMING_TOKEN);
    Ok(out)
  }
}

/// Convierte el texto devuelto por el servicio de completions en una
/// sentencia: colapsa las secuencias `\n` literales y los saltos de línea
/// reales a espacios y envuelve el cuerpo como `select <cuerpo>;`.
///
/// No valida el SQL resultante; el único control es su ejecución posterior.
pub fn completion_to_select(completion: &str) -> String {
  let body = completion.replace("\\n", " ").replace("\r\n", " ").replace('\n', " ");
  format!("select {};", body)
}
