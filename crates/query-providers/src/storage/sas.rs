// Firma SAS con clave de delegación de usuario. Todo el módulo es puro: las
// horas se reciben como parámetro.
use super::STORAGE_API_VERSION;
use crate::errors::{ProviderError, Result};
use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use chrono::{DateTime, Duration, SecondsFormat, Utc};
use hmac::{Hmac, Mac};
use serde::Deserialize;
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

/// Clave devuelta por `?restype=service&comp=userdelegationkey`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct UserDelegationKey {
  pub signed_oid: String,
  pub signed_tid: String,
  pub signed_start: String,
  pub signed_expiry: String,
  pub signed_service: String,
  pub signed_version: String,
  /// Valor en base64.
  pub value: String,
}

impl UserDelegationKey {
  /// Extrae la clave del XML de respuesta del servicio.
  pub fn from_xml(xml: &str) -> Result<Self> {
    quick_xml::de::from_str(xml).map_err(|e| ProviderError::Storage(format!("clave de delegación inválida: {}", e)))
  }
}

/// Formato de fecha aceptado por el servicio (`2024-01-01T00:00:00Z`).
pub fn format_time(t: DateTime<Utc>) -> String {
  t.to_rfc3339_opts(SecondsFormat::Secs, true)
}

/// Validez pedida para la clave de delegación: de una hora antes a una hora
/// después de `now`.
pub fn delegation_key_window(now: DateTime<Utc>) -> (DateTime<Utc>, DateTime<Utc>) {
  (now - Duration::hours(1), now + Duration::hours(1))
}

/// Cuerpo XML de la petición de la clave de delegación.
pub fn key_info_xml(now: DateTime<Utc>) -> String {
  let (start, expiry) = delegation_key_window(now);
  format!("<?xml version=\"1.0\" encoding=\"utf-8\"?><KeyInfo><Start>{}</Start><Expiry>{}</Expiry></KeyInfo>",
          format_time(start),
          format_time(expiry))
}

/// Intervalo de validez de la URL firmada.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SasWindow {
  pub start: DateTime<Utc>,
  pub expiry: DateTime<Utc>,
}

impl SasWindow {
  /// `st = now - 15 min`, `se = now + 30 min`.
  pub fn read_window(now: DateTime<Utc>) -> Self {
    Self { start: now - Duration::minutes(15),
           expiry: now + Duration::minutes(30) }
  }
}

/// Cadena a firmar de un SAS de delegación de usuario (versión 2020-12-06 o
/// posterior) para un blob con permiso de lectura.
fn string_to_sign(key: &UserDelegationKey, account: &str, container: &str, blob: &str, window: &SasWindow) -> String {
  let canonical = format!("/blob/{}/{}/{}", account, container, blob);
  let start = format_time(window.start);
  let expiry = format_time(window.expiry);
  let fields: [&str; 24] = [
    "r",
    &start,
    &expiry,
    &canonical,
    &key.signed_oid,
    &key.signed_tid,
    &key.signed_start,
    &key.signed_expiry,
    &key.signed_service,
    &key.signed_version,
    "", // signedAuthorizedUserObjectId
    "", // signedUnauthorizedUserObjectId
    "", // signedCorrelationId
    "", // signedIP
    "https",
    STORAGE_API_VERSION,
    "b",
    "", // signedSnapshotTime
    "", // signedEncryptionScope
    "", // rscc
    "", // rscd
    "", // rsce
    "", // rscl
    "", // rsct
  ];
  fields.join("\n")
}

fn sign(key_b64: &str, payload: &str) -> Result<String> {
  let key = STANDARD.decode(key_b64.trim())
                    .map_err(|e| ProviderError::Storage(format!("clave de delegación no es base64: {}", e)))?;
  let mut mac = HmacSha256::new_from_slice(&key).map_err(|e| ProviderError::Storage(e.to_string()))?;
  mac.update(payload.as_bytes());
  Ok(STANDARD.encode(mac.finalize().into_bytes()))
}

/// Devuelve `blob_url` con los parámetros SAS de sólo lectura.
pub fn sign_read_url(blob_url: &str,
                     account: &str,
                     container: &str,
                     blob: &str,
                     key: &UserDelegationKey,
                     window: &SasWindow)
                     -> Result<String> {
  let signature = sign(&key.value, &string_to_sign(key, account, container, blob, window))?;
  let mut url = reqwest::Url::parse(blob_url).map_err(|e| ProviderError::Storage(format!("URL de blob inválida: {}", e)))?;
  url.query_pairs_mut()
     .append_pair("sp", "r")
     .append_pair("st", &format_time(window.start))
     .append_pair("se", &format_time(window.expiry))
     .append_pair("skoid", &key.signed_oid)
     .append_pair("sktid", &key.signed_tid)
     .append_pair("skt", &key.signed_start)
     .append_pair("ske", &key.signed_expiry)
     .append_pair("sks", &key.signed_service)
     .append_pair("skv", &key.signed_version)
     .append_pair("spr", "https")
     .append_pair("sv", STORAGE_API_VERSION)
     .append_pair("sr", "b")
     .append_pair("sig", &signature);
  Ok(url.to_string())
}

#[cfg(test)]
mod tests {
  use super::*;
  use chrono::TimeZone;

  const KEY_XML: &str = r#"<?xml version="1.0" encoding="utf-8"?>
<UserDelegationKey>
  <SignedOid>oid-1</SignedOid>
  <SignedTid>tid-1</SignedTid>
  <SignedStart>2024-05-01T09:00:00Z</SignedStart>
  <SignedExpiry>2024-05-01T11:00:00Z</SignedExpiry>
  <SignedService>b</SignedService>
  <SignedVersion>2021-08-06</SignedVersion>
  <Value>c2VjcmV0LWtleS1ieXRlcw==</Value>
</UserDelegationKey>"#;

  fn now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 5, 1, 10, 0, 0).unwrap()
  }

  #[test]
  fn parses_delegation_key() {
    let key = UserDelegationKey::from_xml(KEY_XML).unwrap();
    assert_eq!(key.signed_oid, "oid-1");
    assert_eq!(key.value, "c2VjcmV0LWtleS1ieXRlcw==");
  }

  #[test]
  fn delegation_key_text_is_unescaped() {
    let xml = KEY_XML.replace("<SignedOid>oid-1</SignedOid>", "<SignedOid>a&amp;b</SignedOid>");
    assert_eq!(UserDelegationKey::from_xml(&xml).unwrap().signed_oid, "a&b");
  }

  #[test]
  fn missing_tag_is_a_storage_error() {
    let err = UserDelegationKey::from_xml("<UserDelegationKey></UserDelegationKey>").unwrap_err();
    assert!(matches!(err, ProviderError::Storage(_)));
  }

  #[test]
  fn key_request_spans_two_hours() {
    let body = key_info_xml(now());
    assert!(body.contains("<Start>2024-05-01T09:00:00Z</Start>"));
    assert!(body.contains("<Expiry>2024-05-01T11:00:00Z</Expiry>"));
  }

  #[test]
  fn read_window_expires_within_thirty_minutes() {
    let w = SasWindow::read_window(now());
    assert_eq!(w.start, now() - Duration::minutes(15));
    assert!(w.expiry - now() <= Duration::minutes(30));
  }

  #[test]
  fn signed_url_is_deterministic_and_read_only() {
    let key = UserDelegationKey::from_xml(KEY_XML).unwrap();
    let w = SasWindow::read_window(now());
    let blob_url = "https://acct.blob.core.windows.net/results/file_1.csv";
    let a = sign_read_url(blob_url, "acct", "results", "file_1.csv", &key, &w).unwrap();
    let b = sign_read_url(blob_url, "acct", "results", "file_1.csv", &key, &w).unwrap();
    assert_eq!(a, b);
    assert!(a.starts_with("https://acct.blob.core.windows.net/results/file_1.csv?sp=r&"));
    assert!(a.contains("se=2024-05-01T10%3A30%3A00Z"));
    assert!(a.contains("sr=b"));
    assert!(a.contains("&sig="));
  }

  #[test]
  fn signature_depends_on_blob_name() {
    let key = UserDelegationKey::from_xml(KEY_XML).unwrap();
    let w = SasWindow::read_window(now());
    let a = string_to_sign(&key, "acct", "results", "a.csv", &w);
    let b = string_to_sign(&key, "acct", "results", "b.csv", &w);
    assert_ne!(sign(&key.value, &a).unwrap(), sign(&key.value, &b).unwrap());
    assert_eq!(a.split('\n').count(), 24);
  }

  #[test]
  fn bad_key_value_is_rejected() {
    assert!(sign("not base64!!", "x").is_err());
  }
}
