use super::model::{
    AlunoDados, AlunoRecord, Curso, CursoUso, ExclusaoCurso, NovoCurso, TurmaDados, TurmaRecord,
};
use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard};

/// Acesso aos dados de cursos, turmas e alunos.
///
/// Listagens retornam em ordem crescente de id. As operações de atualização
/// falham se o registro não existir; as de exclusão retornam `false`.
pub trait EscolaRepository: Send + Sync {
    fn list_cursos(&self) -> anyhow::Result<Vec<Curso>>;
    fn get_curso(&self, id: i64) -> anyhow::Result<Option<Curso>>;
    /// Busca exata pelo nome.
    fn find_curso_by_nome(&self, nome: &str) -> anyhow::Result<Option<Curso>>;
    /// Busca ignorando maiúsculas/minúsculas e espaços nas pontas.
    fn find_curso_by_nome_ignore_case(&self, nome: &str) -> anyhow::Result<Option<Curso>>;
    fn insert_curso(&self, curso: NovoCurso) -> anyhow::Result<Curso>;
    fn update_curso(&self, curso: &Curso) -> anyhow::Result<()>;
    /// Verifica o uso e exclui numa única operação atômica.
    fn delete_curso_if_unused(&self, id: i64) -> anyhow::Result<ExclusaoCurso>;
    fn curso_uso(&self, id: i64) -> anyhow::Result<CursoUso>;

    fn list_turmas(&self) -> anyhow::Result<Vec<TurmaRecord>>;
    fn get_turma(&self, id: i64) -> anyhow::Result<Option<TurmaRecord>>;
    fn insert_turma(&self, dados: TurmaDados) -> anyhow::Result<TurmaRecord>;
    fn update_turma(&self, turma: &TurmaRecord) -> anyhow::Result<()>;
    /// Remove a turma; os alunos dela ficam sem turma.
    fn delete_turma(&self, id: i64) -> anyhow::Result<bool>;
    fn count_alunos_in_turma(&self, id: i64) -> anyhow::Result<usize>;

    fn list_alunos(&self) -> anyhow::Result<Vec<AlunoRecord>>;
    fn get_aluno(&self, codigo: i64) -> anyhow::Result<Option<AlunoRecord>>;
    fn insert_aluno(&self, dados: AlunoDados) -> anyhow::Result<AlunoRecord>;
    fn update_aluno(&self, aluno: &AlunoRecord) -> anyhow::Result<()>;
    fn delete_aluno(&self, codigo: i64) -> anyhow::Result<bool>;
}

/// Comparação de nomes de curso usada pela busca sem distinção de caixa.
pub fn nome_equivale(a: &str, b: &str) -> bool {
    a.trim().to_lowercase() == b.trim().to_lowercase()
}

#[derive(Default)]
struct Tabelas {
    cursos: BTreeMap<i64, Curso>,
    turmas: BTreeMap<i64, TurmaDados>,
    alunos: BTreeMap<i64, AlunoDados>,
    seq_curso: i64,
    seq_turma: i64,
    seq_aluno: i64,
}

impl Tabelas {
    fn uso(&self, id: i64) -> CursoUso {
        CursoUso {
            turmas: self.turmas.values().filter(|t| t.curso_ids.contains(&id)).count(),
            alunos: self.alunos.values().filter(|a| a.curso_ids.contains(&id)).count(),
        }
    }
}

fn proximo(seq: &mut i64) -> i64 {
    *seq += 1;
    *seq
}

/// Repositório em memória, usado em testes e com `--memory`.
#[derive(Default)]
pub struct InMemoryRepository {
    inner: Mutex<Tabelas>,
}

impl InMemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }

    fn tabelas(&self) -> anyhow::Result<MutexGuard<'_, Tabelas>> {
        self.inner
            .lock()
            .map_err(|_| anyhow::anyhow!("mutex do repositório envenenado"))
    }
}

impl EscolaRepository for InMemoryRepository {
    fn list_cursos(&self) -> anyhow::Result<Vec<Curso>> {
        Ok(self.tabelas()?.cursos.values().cloned().collect())
    }

    fn get_curso(&self, id: i64) -> anyhow::Result<Option<Curso>> {
        Ok(self.tabelas()?.cursos.get(&id).cloned())
    }

    fn find_curso_by_nome(&self, nome: &str) -> anyhow::Result<Option<Curso>> {
        let tabelas = self.tabelas()?;
        Ok(tabelas.cursos.values().find(|c| c.nome == nome).cloned())
    }

    fn find_curso_by_nome_ignore_case(&self, nome: &str) -> anyhow::Result<Option<Curso>> {
        let tabelas = self.tabelas()?;
        Ok(tabelas
            .cursos
            .values()
            .find(|c| nome_equivale(&c.nome, nome))
            .cloned())
    }

    fn insert_curso(&self, curso: NovoCurso) -> anyhow::Result<Curso> {
        let mut tabelas = self.tabelas()?;
        let id = proximo(&mut tabelas.seq_curso);
        let curso = Curso {
            id,
            nome: curso.nome,
            carga_horaria: curso.carga_horaria,
        };
        tabelas.cursos.insert(id, curso.clone());
        Ok(curso)
    }

    fn update_curso(&self, curso: &Curso) -> anyhow::Result<()> {
        let mut tabelas = self.tabelas()?;
        if let Some(atual) = tabelas.cursos.get_mut(&curso.id) {
            *atual = curso.clone();
            return Ok(());
        }
        anyhow::bail!("Curso '{}' não encontrado", curso.id);
    }

    fn delete_curso_if_unused(&self, id: i64) -> anyhow::Result<ExclusaoCurso> {
        let mut tabelas = self.tabelas()?;
        if !tabelas.cursos.contains_key(&id) {
            return Ok(ExclusaoCurso::NaoEncontrado);
        }
        let uso = tabelas.uso(id);
        if uso.em_uso() {
            return Ok(ExclusaoCurso::EmUso(uso));
        }
        tabelas.cursos.remove(&id);
        Ok(ExclusaoCurso::Excluido)
    }

    fn curso_uso(&self, id: i64) -> anyhow::Result<CursoUso> {
        Ok(self.tabelas()?.uso(id))
    }

    fn list_turmas(&self) -> anyhow::Result<Vec<TurmaRecord>> {
        let tabelas = self.tabelas()?;
        Ok(tabelas
            .turmas
            .iter()
            .map(|(id, dados)| TurmaRecord {
                id: *id,
                dados: dados.clone(),
            })
            .collect())
    }

    fn get_turma(&self, id: i64) -> anyhow::Result<Option<TurmaRecord>> {
        let tabelas = self.tabelas()?;
        Ok(tabelas.turmas.get(&id).map(|dados| TurmaRecord {
            id,
            dados: dados.clone(),
        }))
    }

    fn insert_turma(&self, dados: TurmaDados) -> anyhow::Result<TurmaRecord> {
        let mut tabelas = self.tabelas()?;
        let id = proximo(&mut tabelas.seq_turma);
        tabelas.turmas.insert(id, dados.clone());
        Ok(TurmaRecord { id, dados })
    }

    fn update_turma(&self, turma: &TurmaRecord) -> anyhow::Result<()> {
        let mut tabelas = self.tabelas()?;
        if let Some(atual) = tabelas.turmas.get_mut(&turma.id) {
            *atual = turma.dados.clone();
            return Ok(());
        }
        anyhow::bail!("Turma '{}' não encontrada", turma.id);
    }

    fn delete_turma(&self, id: i64) -> anyhow::Result<bool> {
        let mut tabelas = self.tabelas()?;
        if tabelas.turmas.remove(&id).is_none() {
            return Ok(false);
        }
        for aluno in tabelas.alunos.values_mut() {
            if aluno.turma_id == Some(id) {
                aluno.turma_id = None;
            }
        }
        Ok(true)
    }

    fn count_alunos_in_turma(&self, id: i64) -> anyhow::Result<usize> {
        let tabelas = self.tabelas()?;
        Ok(tabelas
            .alunos
            .values()
            .filter(|a| a.turma_id == Some(id))
            .count())
    }

    fn list_alunos(&self) -> anyhow::Result<Vec<AlunoRecord>> {
        let tabelas = self.tabelas()?;
        Ok(tabelas
            .alunos
            .iter()
            .map(|(codigo, dados)| AlunoRecord {
                codigo: *codigo,
                dados: dados.clone(),
            })
            .collect())
    }

    fn get_aluno(&self, codigo: i64) -> anyhow::Result<Option<AlunoRecord>> {
        let tabelas = self.tabelas()?;
        Ok(tabelas.alunos.get(&codigo).map(|dados| AlunoRecord {
            codigo,
            dados: dados.clone(),
        }))
    }

    fn insert_aluno(&self, dados: AlunoDados) -> anyhow::Result<AlunoRecord> {
        let mut tabelas = self.tabelas()?;
        let codigo = proximo(&mut tabelas.seq_aluno);
        tabelas.alunos.insert(codigo, dados.clone());
        Ok(AlunoRecord { codigo, dados })
    }

    fn update_aluno(&self, aluno: &AlunoRecord) -> anyhow::Result<()> {
        let mut tabelas = self.tabelas()?;
        if let Some(atual) = tabelas.alunos.get_mut(&aluno.codigo) {
            *atual = aluno.dados.clone();
            return Ok(());
        }
        anyhow::bail!("Aluno '{}' não encontrado", aluno.codigo);
    }

    fn delete_aluno(&self, codigo: i64) -> anyhow::Result<bool> {
        Ok(self.tabelas()?.alunos.remove(&codigo).is_some())
    }
}
