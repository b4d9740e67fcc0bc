use super::datas;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

// -------------------------
// Curso
// -------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Curso {
    pub id: i64,
    pub nome: String,
    /// Carga horária em horas
    pub carga_horaria: u32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NovoCurso {
    pub nome: String,
    pub carga_horaria: u32,
}

/// Corpo de `POST /cursos` e `PUT /cursos/{id}`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CursoPayload {
    pub nome: Option<String>,
    pub carga_horaria: Option<u32>,
}

/// Referência a um curso enviada dentro de turmas e alunos: por id ou por nome.
/// Outros campos do objeto são ignorados.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct CursoRef {
    pub id: Option<i64>,
    pub nome: Option<String>,
}

impl CursoRef {
    pub fn por_id(id: i64) -> Self {
        Self {
            id: Some(id),
            nome: None,
        }
    }

    pub fn por_nome(nome: impl Into<String>) -> Self {
        Self {
            id: None,
            nome: Some(nome.into()),
        }
    }
}

/// Quantas turmas e alunos ainda apontam para um curso.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CursoUso {
    pub turmas: usize,
    pub alunos: usize,
}

impl CursoUso {
    pub fn em_uso(&self) -> bool {
        self.turmas > 0 || self.alunos > 0
    }
}

/// Resultado da exclusão de um curso que só acontece se ninguém o usa.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExclusaoCurso {
    Excluido,
    NaoEncontrado,
    EmUso(CursoUso),
}

// -------------------------
// Turma
// -------------------------

/// Linha persistida de uma turma (cursos por id, na ordem da lista).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TurmaDados {
    pub turno: Option<String>,
    pub curso_ids: Vec<i64>,
    pub data_inicio: Option<NaiveDate>,
    pub data_fim: Option<NaiveDate>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TurmaRecord {
    pub id: i64,
    pub dados: TurmaDados,
}

/// Turma como exposta pela API. A lista de alunos nunca é serializada,
/// apenas a contagem.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Turma {
    pub id: i64,
    pub turno: Option<String>,
    pub cursos: Vec<Curso>,
    #[serde(default, with = "datas::opcional")]
    pub data_inicio: Option<NaiveDate>,
    #[serde(default, with = "datas::opcional")]
    pub data_fim: Option<NaiveDate>,
    pub quantidade_alunos: usize,
}

/// Turma embutida no aluno, sem cursos nem contagem.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TurmaResumo {
    pub id: i64,
    pub turno: Option<String>,
    #[serde(default, with = "datas::opcional")]
    pub data_inicio: Option<NaiveDate>,
    #[serde(default, with = "datas::opcional")]
    pub data_fim: Option<NaiveDate>,
}

impl From<&TurmaRecord> for TurmaResumo {
    fn from(record: &TurmaRecord) -> Self {
        Self {
            id: record.id,
            turno: record.dados.turno.clone(),
            data_inicio: record.dados.data_inicio,
            data_fim: record.dados.data_fim,
        }
    }
}

/// Corpo de `POST /turmas` e `PUT /turmas/{id}`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TurmaPayload {
    pub turno: Option<String>,
    pub cursos: Option<Vec<CursoRef>>,
    #[serde(default, with = "datas::opcional")]
    pub data_inicio: Option<NaiveDate>,
    #[serde(default, with = "datas::opcional")]
    pub data_fim: Option<NaiveDate>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct TurmaRef {
    pub id: Option<i64>,
}

// -------------------------
// Aluno
// -------------------------

#[derive(Debug, Clone, Default, PartialEq)]
pub struct AlunoDados {
    pub nome: String,
    pub turma_id: Option<i64>,
    pub curso_ids: Vec<i64>,
    pub data_matricula: Option<NaiveDate>,
    pub mensalidade: Option<f64>,
    pub semestre: Option<i32>,
    pub bolsista: Option<bool>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AlunoRecord {
    pub codigo: i64,
    pub dados: AlunoDados,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Aluno {
    pub codigo: i64,
    pub nome: String,
    pub turma: Option<TurmaResumo>,
    pub cursos: Vec<Curso>,
    #[serde(default, with = "datas::opcional")]
    pub data_matricula: Option<NaiveDate>,
    pub mensalidade: Option<f64>,
    pub semestre: Option<i32>,
    pub bolsista: Option<bool>,
}

/// Corpo de `POST /alunos` e `PUT /alunos/{id}`. Todos os campos são opcionais;
/// na edição só os presentes sobrescrevem o registro.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AlunoPayload {
    pub nome: Option<String>,
    pub turma: Option<TurmaRef>,
    pub cursos: Option<Vec<CursoRef>>,
    #[serde(default, with = "datas::opcional")]
    pub data_matricula: Option<NaiveDate>,
    pub mensalidade: Option<f64>,
    pub semestre: Option<i32>,
    pub bolsista: Option<bool>,
}
