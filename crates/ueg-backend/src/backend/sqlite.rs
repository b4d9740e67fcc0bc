//! Repositório relacional em SQLite.
//!
//! As listas de cursos de turmas e alunos ficam em tabelas de junção
//! (`turma_curso`, `matricula`) com uma coluna de posição para manter a ordem.

use super::model::{
    AlunoDados, AlunoRecord, Curso, CursoUso, ExclusaoCurso, NovoCurso, TurmaDados, TurmaRecord,
};
use super::repository::{nome_equivale, EscolaRepository};
use anyhow::{Context, Result};
use rusqlite::{params, Connection, OptionalExtension, Row, Transaction};
use std::fs;
use std::path::Path;
use std::sync::{Mutex, MutexGuard};

const SCHEMA: &str = r"
    CREATE TABLE IF NOT EXISTS curso (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        nome TEXT NOT NULL,
        carga_horaria INTEGER NOT NULL DEFAULT 0
    );

    CREATE TABLE IF NOT EXISTS turma (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        turno TEXT,
        data_inicio TEXT,
        data_fim TEXT
    );

    CREATE TABLE IF NOT EXISTS turma_curso (
        id_turma INTEGER NOT NULL REFERENCES turma(id) ON DELETE CASCADE,
        posicao INTEGER NOT NULL,
        id_curso INTEGER NOT NULL REFERENCES curso(id),
        PRIMARY KEY (id_turma, posicao)
    );

    CREATE TABLE IF NOT EXISTS aluno (
        codigo INTEGER PRIMARY KEY AUTOINCREMENT,
        nome TEXT NOT NULL,
        id_turma INTEGER REFERENCES turma(id) ON DELETE SET NULL,
        data_matricula TEXT,
        mensalidade REAL,
        semestre INTEGER,
        bolsista INTEGER
    );

    CREATE TABLE IF NOT EXISTS matricula (
        id_aluno INTEGER NOT NULL REFERENCES aluno(codigo) ON DELETE CASCADE,
        posicao INTEGER NOT NULL,
        id_curso INTEGER NOT NULL REFERENCES curso(id),
        PRIMARY KEY (id_aluno, posicao)
    );

    CREATE INDEX IF NOT EXISTS idx_aluno_turma ON aluno(id_turma);
    CREATE INDEX IF NOT EXISTS idx_turma_curso_curso ON turma_curso(id_curso);
    CREATE INDEX IF NOT EXISTS idx_matricula_curso ON matricula(id_curso);
";

/// Tabela de junção com cursos: (tabela, coluna do dono).
#[derive(Clone, Copy)]
enum Juncao {
    TurmaCurso,
    Matricula,
}

impl Juncao {
    fn tabela(self) -> &'static str {
        match self {
            Juncao::TurmaCurso => "turma_curso",
            Juncao::Matricula => "matricula",
        }
    }

    fn coluna(self) -> &'static str {
        match self {
            Juncao::TurmaCurso => "id_turma",
            Juncao::Matricula => "id_aluno",
        }
    }
}

pub struct SqliteRepository {
    conn: Mutex<Connection>,
}

impl SqliteRepository {
    /// Abre (ou cria) o banco no caminho indicado, criando os diretórios pais.
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).with_context(|| {
                    format!("Falha ao criar diretório do banco: {}", parent.display())
                })?;
            }
        }
        let conn = Connection::open(path)
            .with_context(|| format!("Falha ao abrir banco em {}", path.display()))?;
        Self::initialize(conn)
    }

    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().context("Falha ao abrir banco em memória")?;
        Self::initialize(conn)
    }

    fn initialize(conn: Connection) -> Result<Self> {
        conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA foreign_keys=ON;")
            .context("Falha ao configurar pragmas do banco")?;
        conn.execute_batch(SCHEMA)
            .context("Falha ao criar schema do banco")?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn conn(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| anyhow::anyhow!("mutex da conexão envenenado"))
    }
}

fn curso_from_row(row: &Row<'_>) -> rusqlite::Result<Curso> {
    Ok(Curso {
        id: row.get(0)?,
        nome: row.get(1)?,
        carga_horaria: row.get(2)?,
    })
}

fn contar_uso(conn: &Connection, id: i64) -> Result<CursoUso> {
    let turmas: i64 = conn.query_row(
        "SELECT COUNT(DISTINCT id_turma) FROM turma_curso WHERE id_curso = ?1",
        [id],
        |row| row.get(0),
    )?;
    let alunos: i64 = conn.query_row(
        "SELECT COUNT(DISTINCT id_aluno) FROM matricula WHERE id_curso = ?1",
        [id],
        |row| row.get(0),
    )?;
    Ok(CursoUso {
        turmas: turmas as usize,
        alunos: alunos as usize,
    })
}

fn curso_ids(conn: &Connection, juncao: Juncao, dono: i64) -> Result<Vec<i64>> {
    let sql = format!(
        "SELECT id_curso FROM {} WHERE {} = ?1 ORDER BY posicao",
        juncao.tabela(),
        juncao.coluna()
    );
    let mut stmt = conn.prepare_cached(&sql)?;
    let ids = stmt
        .query_map([dono], |row| row.get(0))?
        .collect::<rusqlite::Result<Vec<i64>>>()?;
    Ok(ids)
}

fn replace_curso_ids(tx: &Transaction<'_>, juncao: Juncao, dono: i64, ids: &[i64]) -> Result<()> {
    tx.execute(
        &format!("DELETE FROM {} WHERE {} = ?1", juncao.tabela(), juncao.coluna()),
        [dono],
    )?;
    let sql = format!(
        "INSERT INTO {} ({}, posicao, id_curso) VALUES (?1, ?2, ?3)",
        juncao.tabela(),
        juncao.coluna()
    );
    for (posicao, id_curso) in ids.iter().enumerate() {
        tx.execute(&sql, params![dono, posicao as i64, id_curso])
            .with_context(|| format!("Falha ao vincular curso {id_curso}"))?;
    }
    Ok(())
}

fn turma_from_row(conn: &Connection, row: (i64, TurmaDados)) -> Result<TurmaRecord> {
    let (id, mut dados) = row;
    dados.curso_ids = curso_ids(conn, Juncao::TurmaCurso, id)?;
    Ok(TurmaRecord { id, dados })
}

fn turma_cols(row: &Row<'_>) -> rusqlite::Result<(i64, TurmaDados)> {
    Ok((
        row.get(0)?,
        TurmaDados {
            turno: row.get(1)?,
            curso_ids: Vec::new(),
            data_inicio: row.get(2)?,
            data_fim: row.get(3)?,
        },
    ))
}

fn aluno_cols(row: &Row<'_>) -> rusqlite::Result<(i64, AlunoDados)> {
    Ok((
        row.get(0)?,
        AlunoDados {
            nome: row.get(1)?,
            turma_id: row.get(2)?,
            curso_ids: Vec::new(),
            data_matricula: row.get(3)?,
            mensalidade: row.get(4)?,
            semestre: row.get(5)?,
            bolsista: row.get(6)?,
        },
    ))
}

fn aluno_from_row(conn: &Connection, row: (i64, AlunoDados)) -> Result<AlunoRecord> {
    let (codigo, mut dados) = row;
    dados.curso_ids = curso_ids(conn, Juncao::Matricula, codigo)?;
    Ok(AlunoRecord { codigo, dados })
}

const SELECT_TURMA: &str = "SELECT id, turno, data_inicio, data_fim FROM turma";
const SELECT_ALUNO: &str = "SELECT codigo, nome, id_turma, data_matricula, mensalidade, semestre, bolsista FROM aluno";

impl EscolaRepository for SqliteRepository {
    fn list_cursos(&self) -> Result<Vec<Curso>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare_cached("SELECT id, nome, carga_horaria FROM curso ORDER BY id")?;
        let cursos = stmt
            .query_map([], curso_from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()
            .context("Falha ao listar cursos")?;
        Ok(cursos)
    }

    fn get_curso(&self, id: i64) -> Result<Option<Curso>> {
        let conn = self.conn()?;
        conn.query_row(
            "SELECT id, nome, carga_horaria FROM curso WHERE id = ?1",
            [id],
            curso_from_row,
        )
        .optional()
        .with_context(|| format!("Falha ao consultar curso {id}"))
    }

    fn find_curso_by_nome(&self, nome: &str) -> Result<Option<Curso>> {
        let conn = self.conn()?;
        conn.query_row(
            "SELECT id, nome, carga_horaria FROM curso WHERE nome = ?1 ORDER BY id LIMIT 1",
            [nome],
            curso_from_row,
        )
        .optional()
        .context("Falha ao buscar curso por nome")
    }

    fn find_curso_by_nome_ignore_case(&self, nome: &str) -> Result<Option<Curso>> {
        // LOWER() do SQLite só conhece ASCII; a comparação é feita aqui.
        Ok(self
            .list_cursos()?
            .into_iter()
            .find(|c| nome_equivale(&c.nome, nome)))
    }

    fn insert_curso(&self, curso: NovoCurso) -> Result<Curso> {
        let conn = self.conn()?;
        conn.execute(
            "INSERT INTO curso (nome, carga_horaria) VALUES (?1, ?2)",
            params![curso.nome, curso.carga_horaria],
        )
        .context("Falha ao inserir curso")?;
        Ok(Curso {
            id: conn.last_insert_rowid(),
            nome: curso.nome,
            carga_horaria: curso.carga_horaria,
        })
    }

    fn update_curso(&self, curso: &Curso) -> Result<()> {
        let conn = self.conn()?;
        let alterados = conn
            .execute(
                "UPDATE curso SET nome = ?1, carga_horaria = ?2 WHERE id = ?3",
                params![curso.nome, curso.carga_horaria, curso.id],
            )
            .context("Falha ao atualizar curso")?;
        if alterados == 0 {
            anyhow::bail!("Curso '{}' não encontrado", curso.id);
        }
        Ok(())
    }

    fn delete_curso_if_unused(&self, id: i64) -> Result<ExclusaoCurso> {
        let mut conn = self.conn()?;
        let tx = conn.transaction()?;
        let existe: bool = tx.query_row(
            "SELECT EXISTS(SELECT 1 FROM curso WHERE id = ?1)",
            [id],
            |row| row.get(0),
        )?;
        if !existe {
            return Ok(ExclusaoCurso::NaoEncontrado);
        }
        let uso = contar_uso(&tx, id)?;
        if uso.em_uso() {
            return Ok(ExclusaoCurso::EmUso(uso));
        }
        tx.execute("DELETE FROM curso WHERE id = ?1", [id])
            .with_context(|| format!("Falha ao excluir curso {id}"))?;
        tx.commit().context("Falha ao confirmar exclusão do curso")?;
        Ok(ExclusaoCurso::Excluido)
    }

    fn curso_uso(&self, id: i64) -> Result<CursoUso> {
        let conn = self.conn()?;
        contar_uso(&conn, id)
    }

    fn list_turmas(&self) -> Result<Vec<TurmaRecord>> {
        let conn = self.conn()?;
        let linhas = {
            let mut stmt = conn.prepare_cached(&format!("{SELECT_TURMA} ORDER BY id"))?;
            let linhas = stmt
                .query_map([], turma_cols)?
                .collect::<rusqlite::Result<Vec<_>>>()
                .context("Falha ao listar turmas")?;
            linhas
        };
        linhas
            .into_iter()
            .map(|linha| turma_from_row(&conn, linha))
            .collect()
    }

    fn get_turma(&self, id: i64) -> Result<Option<TurmaRecord>> {
        let conn = self.conn()?;
        let linha = conn
            .query_row(&format!("{SELECT_TURMA} WHERE id = ?1"), [id], turma_cols)
            .optional()
            .with_context(|| format!("Falha ao consultar turma {id}"))?;
        linha.map(|linha| turma_from_row(&conn, linha)).transpose()
    }

    fn insert_turma(&self, dados: TurmaDados) -> Result<TurmaRecord> {
        let mut conn = self.conn()?;
        let tx = conn.transaction()?;
        tx.execute(
            "INSERT INTO turma (turno, data_inicio, data_fim) VALUES (?1, ?2, ?3)",
            params![dados.turno, dados.data_inicio, dados.data_fim],
        )
        .context("Falha ao inserir turma")?;
        let id = tx.last_insert_rowid();
        replace_curso_ids(&tx, Juncao::TurmaCurso, id, &dados.curso_ids)?;
        tx.commit().context("Falha ao confirmar inserção da turma")?;
        Ok(TurmaRecord { id, dados })
    }

    fn update_turma(&self, turma: &TurmaRecord) -> Result<()> {
        let mut conn = self.conn()?;
        let tx = conn.transaction()?;
        let dados = &turma.dados;
        let alterados = tx
            .execute(
                "UPDATE turma SET turno = ?1, data_inicio = ?2, data_fim = ?3 WHERE id = ?4",
                params![dados.turno, dados.data_inicio, dados.data_fim, turma.id],
            )
            .context("Falha ao atualizar turma")?;
        if alterados == 0 {
            anyhow::bail!("Turma '{}' não encontrada", turma.id);
        }
        replace_curso_ids(&tx, Juncao::TurmaCurso, turma.id, &dados.curso_ids)?;
        tx.commit().context("Falha ao confirmar atualização da turma")?;
        Ok(())
    }

    fn delete_turma(&self, id: i64) -> Result<bool> {
        let conn = self.conn()?;
        let removidos = conn
            .execute("DELETE FROM turma WHERE id = ?1", [id])
            .with_context(|| format!("Falha ao excluir turma {id}"))?;
        Ok(removidos > 0)
    }

    fn count_alunos_in_turma(&self, id: i64) -> Result<usize> {
        let conn = self.conn()?;
        let total: i64 = conn.query_row(
            "SELECT COUNT(*) FROM aluno WHERE id_turma = ?1",
            [id],
            |row| row.get(0),
        )?;
        Ok(total as usize)
    }

    fn list_alunos(&self) -> Result<Vec<AlunoRecord>> {
        let conn = self.conn()?;
        let linhas = {
            let mut stmt = conn.prepare_cached(&format!("{SELECT_ALUNO} ORDER BY codigo"))?;
            let linhas = stmt
                .query_map([], aluno_cols)?
                .collect::<rusqlite::Result<Vec<_>>>()
                .context("Falha ao listar alunos")?;
            linhas
        };
        linhas
            .into_iter()
            .map(|linha| aluno_from_row(&conn, linha))
            .collect()
    }

    fn get_aluno(&self, codigo: i64) -> Result<Option<AlunoRecord>> {
        let conn = self.conn()?;
        let linha = conn
            .query_row(&format!("{SELECT_ALUNO} WHERE codigo = ?1"), [codigo], aluno_cols)
            .optional()
            .with_context(|| format!("Falha ao consultar aluno {codigo}"))?;
        linha.map(|linha| aluno_from_row(&conn, linha)).transpose()
    }

    fn insert_aluno(&self, dados: AlunoDados) -> Result<AlunoRecord> {
        let mut conn = self.conn()?;
        let tx = conn.transaction()?;
        tx.execute(
            "INSERT INTO aluno (nome, id_turma, data_matricula, mensalidade, semestre, bolsista)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                dados.nome,
                dados.turma_id,
                dados.data_matricula,
                dados.mensalidade,
                dados.semestre,
                dados.bolsista
            ],
        )
        .context("Falha ao inserir aluno")?;
        let codigo = tx.last_insert_rowid();
        replace_curso_ids(&tx, Juncao::Matricula, codigo, &dados.curso_ids)?;
        tx.commit().context("Falha ao confirmar inserção do aluno")?;
        Ok(AlunoRecord { codigo, dados })
    }

    fn update_aluno(&self, aluno: &AlunoRecord) -> Result<()> {
        let mut conn = self.conn()?;
        let tx = conn.transaction()?;
        let dados = &aluno.dados;
        let alterados = tx
            .execute(
                "UPDATE aluno SET nome = ?1, id_turma = ?2, data_matricula = ?3,
                 mensalidade = ?4, semestre = ?5, bolsista = ?6 WHERE codigo = ?7",
                params![
                    dados.nome,
                    dados.turma_id,
                    dados.data_matricula,
                    dados.mensalidade,
                    dados.semestre,
                    dados.bolsista,
                    aluno.codigo
                ],
            )
            .context("Falha ao atualizar aluno")?;
        if alterados == 0 {
            anyhow::bail!("Aluno '{}' não encontrado", aluno.codigo);
        }
        replace_curso_ids(&tx, Juncao::Matricula, aluno.codigo, &dados.curso_ids)?;
        tx.commit().context("Falha ao confirmar atualização do aluno")?;
        Ok(())
    }

    fn delete_aluno(&self, codigo: i64) -> Result<bool> {
        let conn = self.conn()?;
        let removidos = conn
            .execute("DELETE FROM aluno WHERE codigo = ?1", [codigo])
            .with_context(|| format!("Falha ao excluir aluno {codigo}"))?;
        Ok(removidos > 0)
    }
}
