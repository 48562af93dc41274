//! Boundary adapters for the legacy document layout and loosely typed requests.
//!
//! Older clients store progress as
//! `{usuarioID, nivelActual, nivelesCompletados, intentos, estadisticas}`
//! with string outcomes (`"exito"` / `"fallo"`) and string dates. Nothing
//! past this module sees that shape.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::commands::LevelAttempt;
use crate::error::{ProgressError, Result};
use crate::progress::{Attempt, ProgressAggregate, ProgressStats};
use crate::types::{AttemptOutcome, LearnerId};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LegacyAttempt {
    pub nivel: i64,
    pub resultado: String,
    #[serde(default)]
    pub fecha: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LegacyStats {
    #[serde(default)]
    pub tiempo_jugado_min: i64,
    #[serde(default)]
    pub total_intentos: i64,
    #[serde(default)]
    pub total_exitos: i64,
}

/// Progress document in the legacy layout.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LegacyProgress {
    #[serde(rename = "usuarioID")]
    pub usuario_id: String,
    #[serde(default)]
    pub nivel_actual: i64,
    #[serde(default)]
    pub niveles_completados: Vec<i64>,
    #[serde(default)]
    pub intentos: Vec<LegacyAttempt>,
    #[serde(default)]
    pub estadisticas: LegacyStats,
}

fn non_negative(value: i64, field: &str) -> Result<u64> {
    u64::try_from(value).map_err(|_| ProgressError::invalid(format!("{field} must be >= 0, got {value}")))
}

fn level(value: i64, field: &str) -> Result<u32> {
    u32::try_from(value).map_err(|_| ProgressError::invalid(format!("{field} out of range: {value}")))
}

/// Parse an RFC 3339 instant, or a bare `YYYY-MM-DD` date taken as UTC midnight.
pub fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(instant) = DateTime::parse_from_rfc3339(raw) {
        return Ok(instant.with_timezone(&Utc));
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
        .ok_or_else(|| ProgressError::invalid(format!("malformed timestamp: {raw:?}")))
}

fn parse_outcome(raw: &str) -> Result<AttemptOutcome> {
    AttemptOutcome::parse(raw).ok_or_else(|| ProgressError::invalid(format!("unknown outcome: {raw:?}")))
}

fn learner(raw: String) -> Result<LearnerId> {
    if raw.trim().is_empty() {
        return Err(ProgressError::invalid("learner id must not be empty"));
    }
    Ok(LearnerId::new(raw))
}

impl TryFrom<LegacyProgress> for ProgressAggregate {
    type Error = ProgressError;

    /// Validate a legacy document. Repeated completed levels keep their
    /// first position.
    fn try_from(legacy: LegacyProgress) -> Result<Self> {
        let learner_id = learner(legacy.usuario_id)?;
        let current_level = level(legacy.nivel_actual, "nivelActual")?;

        let mut completed = Vec::with_capacity(legacy.niveles_completados.len());
        for raw in legacy.niveles_completados {
            let lvl = level(raw, "nivelesCompletados")?;
            if !completed.contains(&lvl) {
                completed.push(lvl);
            }
        }

        let attempts = legacy
            .intentos
            .into_iter()
            .map(|i| {
                Ok(Attempt::new(
                    level(i.nivel, "intentos.nivel")?,
                    parse_outcome(&i.resultado)?,
                    parse_timestamp(&i.fecha)?,
                ))
            })
            .collect::<Result<Vec<_>>>()?;

        let stats = ProgressStats {
            total_minutes_practiced: non_negative(legacy.estadisticas.tiempo_jugado_min, "tiempoJugadoMin")?,
            total_attempts: non_negative(legacy.estadisticas.total_intentos, "totalIntentos")?,
            total_successes: non_negative(legacy.estadisticas.total_exitos, "totalExitos")?,
        };
        if stats.total_successes > stats.total_attempts {
            return Err(ProgressError::invalid(format!(
                "totalExitos ({}) exceeds totalIntentos ({})",
                stats.total_successes, stats.total_attempts
            )));
        }

        Ok(ProgressAggregate::from_parts(
            learner_id,
            current_level,
            completed,
            attempts,
            stats,
        ))
    }
}

impl From<&ProgressAggregate> for LegacyProgress {
    fn from(progress: &ProgressAggregate) -> Self {
        let clamp = |v: u64| i64::try_from(v).unwrap_or(i64::MAX);
        Self {
            usuario_id: progress.learner_id().to_string(),
            nivel_actual: i64::from(progress.current_level()),
            niveles_completados: progress.completed_levels().iter().map(|&l| i64::from(l)).collect(),
            intentos: progress
                .attempts()
                .iter()
                .map(|a| LegacyAttempt {
                    nivel: i64::from(a.level),
                    resultado: a.outcome.as_legacy_str().to_string(),
                    fecha: a.timestamp.to_rfc3339(),
                })
                .collect(),
            estadisticas: LegacyStats {
                tiempo_jugado_min: clamp(progress.stats().total_minutes_practiced),
                total_intentos: clamp(progress.stats().total_attempts),
                total_exitos: clamp(progress.stats().total_successes),
            },
        }
    }
}

/// Attempt request as it arrives from a client, in either vocabulary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordAttemptRequest {
    #[serde(alias = "usuarioID", alias = "UsuarioID")]
    pub learner_id: String,
    #[serde(alias = "nivel", alias = "Nivel")]
    pub level: i64,
    #[serde(alias = "resultado", alias = "Resultado")]
    pub outcome: String,
    #[serde(default, alias = "fecha", alias = "Fecha")]
    pub timestamp: Option<String>,
    #[serde(default)]
    pub minutes_practiced: u32,
}

/// Same payload; the service decides whether a success completes the level.
pub type CompleteLevelRequest = RecordAttemptRequest;

impl RecordAttemptRequest {
    /// Validate every field into a typed command.
    pub fn into_command(self) -> Result<LevelAttempt> {
        let learner_id = learner(self.learner_id)?;
        let outcome = parse_outcome(&self.outcome)?;
        let timestamp = self
            .timestamp
            .as_deref()
            .filter(|raw| !raw.trim().is_empty())
            .map(parse_timestamp)
            .transpose()?;

        let command = LevelAttempt {
            learner_id,
            level: self.level,
            outcome,
            timestamp,
            minutes_practiced: self.minutes_practiced,
        };
        command.validated_level()?;
        Ok(command)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    const LEGACY: &str = r#"{
        "usuarioID": "u7",
        "nivelActual": 2,
        "nivelesCompletados": [0, 1],
        "intentos": [
            {"nivel": 0, "resultado": "exito", "fecha": "2025-03-01T10:00:00Z"},
            {"nivel": 1, "resultado": "fallo", "fecha": "2025-03-01T10:05:00Z"},
            {"nivel": 1, "resultado": "exito", "fecha": "2025-03-02"}
        ],
        "estadisticas": {"tiempoJugadoMin": 12, "totalIntentos": 3, "totalExitos": 2}
    }"#;

    #[test]
    fn legacy_document_converts_to_aggregate() {
        let legacy: LegacyProgress = serde_json::from_str(LEGACY).unwrap();

        let progress = ProgressAggregate::try_from(legacy).unwrap();

        assert_eq!(progress.learner_id().as_str(), "u7");
        assert_eq!(progress.current_level(), 2);
        assert_eq!(progress.completed_levels(), &[0, 1]);
        assert_eq!(progress.attempts().len(), 3);
        assert_eq!(progress.attempts()[1].outcome, AttemptOutcome::Failure);
        assert_eq!(
            progress.attempts()[2].timestamp,
            Utc.with_ymd_and_hms(2025, 3, 2, 0, 0, 0).unwrap()
        );
        assert_eq!(progress.stats().total_minutes_practiced, 12);
        assert_eq!(progress.stats().total_successes, 2);
    }

    #[test]
    fn aggregate_converts_back_to_legacy_shape() {
        let legacy: LegacyProgress = serde_json::from_str(LEGACY).unwrap();
        let progress = ProgressAggregate::try_from(legacy).unwrap();

        let back = LegacyProgress::from(&progress);
        let json = serde_json::to_value(&back).unwrap();

        assert_eq!(json["usuarioID"], "u7");
        assert_eq!(json["nivelActual"], 2);
        assert_eq!(json["intentos"][0]["resultado"], "exito");
        assert_eq!(json["estadisticas"]["totalIntentos"], 3);
        let again = ProgressAggregate::try_from(back).unwrap();
        assert_eq!(again, progress);
    }

    #[test]
    fn legacy_duplicates_are_collapsed() {
        let legacy = LegacyProgress {
            usuario_id: "u1".into(),
            nivel_actual: 3,
            niveles_completados: vec![2, 0, 2],
            intentos: vec![],
            estadisticas: LegacyStats::default(),
        };

        let progress = ProgressAggregate::try_from(legacy).unwrap();

        assert_eq!(progress.completed_levels(), &[2, 0]);
    }

    #[test]
    fn legacy_with_bad_outcome_is_rejected() {
        let legacy = LegacyProgress {
            usuario_id: "u1".into(),
            nivel_actual: 0,
            niveles_completados: vec![],
            intentos: vec![LegacyAttempt {
                nivel: 0,
                resultado: "quizas".into(),
                fecha: "2025-03-01T00:00:00Z".into(),
            }],
            estadisticas: LegacyStats::default(),
        };

        let err = ProgressAggregate::try_from(legacy).unwrap_err();

        assert!(matches!(err, ProgressError::InvalidArgument(_)));
    }

    #[test]
    fn legacy_with_impossible_counters_is_rejected() {
        let legacy = LegacyProgress {
            usuario_id: "u1".into(),
            nivel_actual: 0,
            niveles_completados: vec![],
            intentos: vec![],
            estadisticas: LegacyStats {
                tiempo_jugado_min: 0,
                total_intentos: 1,
                total_exitos: 2,
            },
        };

        assert!(ProgressAggregate::try_from(legacy).is_err());
    }

    #[test]
    fn request_accepts_legacy_field_names() {
        let json = r#"{"usuarioID": "u1", "nivel": 4, "resultado": "EXITO", "fecha": "2025-03-01T08:00:00+02:00"}"#;

        let cmd = serde_json::from_str::<RecordAttemptRequest>(json)
            .unwrap()
            .into_command()
            .unwrap();

        assert_eq!(cmd.learner_id.as_str(), "u1");
        assert_eq!(cmd.level, 4);
        assert_eq!(cmd.outcome, AttemptOutcome::Success);
        assert_eq!(
            cmd.timestamp,
            Some(Utc.with_ymd_and_hms(2025, 3, 1, 6, 0, 0).unwrap())
        );
    }

    #[test]
    fn request_without_timestamp_leaves_it_unset() {
        let json = r#"{"learnerId": "u1", "level": 0, "outcome": "failure"}"#;

        let cmd = serde_json::from_str::<CompleteLevelRequest>(json)
            .unwrap()
            .into_command()
            .unwrap();

        assert_eq!(cmd.timestamp, None);
        assert_eq!(cmd.outcome, AttemptOutcome::Failure);
    }

    #[test]
    fn request_validation_errors() {
        let base = RecordAttemptRequest {
            learner_id: "u1".into(),
            level: 0,
            outcome: "success".into(),
            timestamp: None,
            minutes_practiced: 0,
        };

        let negative = RecordAttemptRequest { level: -2, ..base.clone() };
        let unknown = RecordAttemptRequest { outcome: "meh".into(), ..base.clone() };
        let malformed = RecordAttemptRequest {
            timestamp: Some("yesterday".into()),
            ..base.clone()
        };
        let anonymous = RecordAttemptRequest { learner_id: " ".into(), ..base };

        for request in [negative, unknown, malformed, anonymous] {
            assert!(matches!(
                request.into_command(),
                Err(ProgressError::InvalidArgument(_))
            ));
        }
    }
}
