use flow::domain::WorkflowRequest;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Workflows expuestos. Ambos comparten coordinador y pasos; sólo cambia si
/// la consulta pasa por el generador de SQL.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum WorkflowType {
    /// Lenguaje natural → SQL generado → ejecución → publicación.
    #[serde(rename = "nl-sql")]
    NaturalLanguage,
    /// SQL literal → ejecución → publicación.
    #[serde(rename = "exec-sql")]
    LiteralSql,
    #[default]
    #[serde(rename = "unknown")]
    Unknown,
}

impl WorkflowType {
    pub fn name(&self) -> &'static str {
        match self {
            WorkflowType::NaturalLanguage => "nl-sql",
            WorkflowType::LiteralSql => "exec-sql",
            WorkflowType::Unknown => "unknown",
        }
    }

    /// Workflow que corresponde a una solicitud según su bandera
    /// `isNaturalLanguage`.
    pub fn for_request(request: &WorkflowRequest) -> Self {
        if request.is_natural_language {
            WorkflowType::NaturalLanguage
        } else {
            WorkflowType::LiteralSql
        }
    }

    /// Construye la solicitud de este workflow para `query`. `None` para
    /// `Unknown`.
    pub fn request(&self, query: Option<String>) -> Option<WorkflowRequest> {
        match self {
            WorkflowType::NaturalLanguage => Some(WorkflowRequest { query,
                                                                    is_natural_language: true }),
            WorkflowType::LiteralSql => Some(WorkflowRequest { query,
                                                               is_natural_language: false }),
            WorkflowType::Unknown => None,
        }
    }
}

impl fmt::Display for WorkflowType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for WorkflowType {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "nl-sql" => Ok(WorkflowType::NaturalLanguage),
            "exec-sql" => Ok(WorkflowType::LiteralSql),
            _ => Ok(WorkflowType::Unknown),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn names_round_trip_and_unknown_is_total() {
        assert_eq!("NL-SQL".parse::<WorkflowType>(), Ok(WorkflowType::NaturalLanguage));
        assert_eq!("exec-sql".parse::<WorkflowType>(), Ok(WorkflowType::LiteralSql));
        assert_eq!("reports".parse::<WorkflowType>(), Ok(WorkflowType::Unknown));
        assert!(WorkflowType::Unknown.request(Some("x".into())).is_none());
    }

    #[test]
    fn request_flag_selects_workflow() {
        let req = WorkflowType::NaturalLanguage.request(Some("all users".into())).unwrap();
        assert!(req.is_natural_language);
        assert_eq!(WorkflowType::for_request(&req), WorkflowType::NaturalLanguage);
        assert_eq!(WorkflowType::for_request(&WorkflowRequest::literal("select 1")), WorkflowType::LiteralSql);
    }
}
