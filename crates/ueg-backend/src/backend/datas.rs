//! Datas da API: sempre `YYYY-MM-DD` na saída; na entrada aceita também
//! timestamps RFC 3339 (como os enviados por `Date` do navegador) e epoch em ms.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Deserializer, Serializer};

pub const FORMATO: &str = "%Y-%m-%d";

#[derive(Deserialize)]
#[serde(untagged)]
enum DataBruta {
    Texto(String),
    Millis(i64),
}

/// Interpreta uma data textual (`YYYY-MM-DD` ou RFC 3339, convertida para UTC).
pub fn parse_data(texto: &str) -> Option<NaiveDate> {
    let texto = texto.trim();
    if let Ok(data) = NaiveDate::parse_from_str(texto, FORMATO) {
        return Some(data);
    }
    DateTime::parse_from_rfc3339(texto)
        .ok()
        .map(|instante| instante.with_timezone(&Utc).date_naive())
}

fn de_millis(millis: i64) -> Option<NaiveDate> {
    DateTime::<Utc>::from_timestamp_millis(millis).map(|instante| instante.date_naive())
}

/// Uso: `#[serde(default, with = "datas::opcional")]` em campos `Option<NaiveDate>`.
pub mod opcional {
    use super::*;

    pub fn serialize<S: Serializer>(data: &Option<NaiveDate>, s: S) -> Result<S::Ok, S::Error> {
        match data {
            Some(data) => s.serialize_str(&data.format(FORMATO).to_string()),
            None => s.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Option<NaiveDate>, D::Error> {
        let bruta = Option::<DataBruta>::deserialize(d)?;
        match bruta {
            None => Ok(None),
            Some(DataBruta::Texto(texto)) if texto.trim().is_empty() => Ok(None),
            Some(DataBruta::Texto(texto)) => parse_data(&texto)
                .map(Some)
                .ok_or_else(|| serde::de::Error::custom(format!("data inválida: '{texto}'"))),
            Some(DataBruta::Millis(millis)) => de_millis(millis)
                .map(Some)
                .ok_or_else(|| serde::de::Error::custom(format!("data inválida: {millis}"))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Serialize;

    #[derive(Debug, Serialize, Deserialize)]
    struct Envelope {
        #[serde(default, with = "opcional")]
        data: Option<NaiveDate>,
    }

    fn ler(json: &str) -> Option<NaiveDate> {
        serde_json::from_str::<Envelope>(json).unwrap().data
    }

    #[test]
    fn test_aceita_formatos_de_entrada() {
        let esperado = NaiveDate::from_ymd_opt(2025, 3, 1);
        assert_eq!(ler(r#"{"data":"2025-03-01"}"#), esperado);
        assert_eq!(ler(r#"{"data":"2025-03-01T00:00:00.000Z"}"#), esperado);
        assert_eq!(ler(r#"{"data":"2025-02-28T21:00:00-03:00"}"#), esperado);
        assert_eq!(ler(r#"{"data":1740787200000}"#), esperado);
    }

    #[test]
    fn test_ausente_nulo_ou_vazio() {
        assert_eq!(ler("{}"), None);
        assert_eq!(ler(r#"{"data":null}"#), None);
        assert_eq!(ler(r#"{"data":""}"#), None);
    }

    #[test]
    fn test_rejeita_data_invalida() {
        assert!(serde_json::from_str::<Envelope>(r#"{"data":"01/03/2025"}"#).is_err());
    }

    #[test]
    fn test_serializa_como_data_simples() {
        let envelope = Envelope {
            data: NaiveDate::from_ymd_opt(2025, 12, 9),
        };
        assert_eq!(
            serde_json::to_string(&envelope).unwrap(),
            r#"{"data":"2025-12-09"}"#
        );
    }
}
