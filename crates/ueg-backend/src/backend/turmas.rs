use super::cursos::CursoService;
use super::error::{ServiceError, ServiceResult};
use super::model::{Curso, Turma, TurmaDados, TurmaPayload, TurmaRecord};
use super::repository::EscolaRepository;
use chrono::{Days, NaiveDate};
use std::sync::Arc;
use tracing::{debug, info};

/// Cada 8 horas de carga horária contam como um dia de aula.
pub const HORAS_POR_DIA: u64 = 8;

/// Data de término estimada: início + (soma das cargas horárias / 8) dias.
///
/// Retorna `None` sem data de início ou sem cursos; nesse caso a data de
/// término atual deve ser mantida.
pub fn calcular_data_fim(inicio: Option<NaiveDate>, cursos: &[Curso]) -> Option<NaiveDate> {
    let inicio = inicio?;
    if cursos.is_empty() {
        return None;
    }
    let horas: u64 = cursos.iter().map(|c| u64::from(c.carga_horaria)).sum();
    inicio.checked_add_days(Days::new(horas / HORAS_POR_DIA))
}

#[derive(Clone)]
pub struct TurmaService {
    repo: Arc<dyn EscolaRepository>,
    cursos: CursoService,
}

impl TurmaService {
    pub fn new(repo: Arc<dyn EscolaRepository>, cursos: CursoService) -> Self {
        Self { repo, cursos }
    }

    pub fn listar(&self) -> ServiceResult<Vec<Turma>> {
        self.repo
            .list_turmas()?
            .into_iter()
            .map(|record| self.montar(record))
            .collect()
    }

    pub fn consultar(&self, id: i64) -> ServiceResult<Turma> {
        let record = self.buscar(id, "Turma não encontrada")?;
        self.montar(record)
    }

    pub fn salvar(&self, payload: TurmaPayload) -> ServiceResult<Turma> {
        let turno = turno_obrigatorio(payload.turno)?;
        let cursos = self.cursos.resolver(&payload.cursos.unwrap_or_default())?;

        let mut dados = TurmaDados {
            turno: Some(turno),
            curso_ids: cursos.iter().map(|c| c.id).collect(),
            data_inicio: payload.data_inicio,
            data_fim: payload.data_fim,
        };
        if dados.data_fim.is_none() {
            dados.data_fim = calcular_data_fim(dados.data_inicio, &cursos);
        }

        let record = self.repo.insert_turma(dados)?;
        info!(id = record.id, cursos = cursos.len(), "turma cadastrada");
        self.montar(record)
    }

    /// `turno` é sempre sobrescrito; `cursos`, `dataInicio` e `dataFim` só
    /// quando enviados. Sem `dataFim` no payload, a data só é recalculada se
    /// a turma ainda não tiver uma.
    pub fn editar(&self, id: i64, payload: TurmaPayload) -> ServiceResult<Turma> {
        let turno = turno_obrigatorio(payload.turno)?;
        let mut record = self.buscar(id, "Turma não encontrada para atualização")?;
        record.dados.turno = Some(turno);

        let cursos = match payload.cursos {
            Some(refs) => {
                let cursos = self.cursos.resolver(&refs)?;
                record.dados.curso_ids = cursos.iter().map(|c| c.id).collect();
                cursos
            }
            None => self.cursos_da_turma(&record)?,
        };

        if let Some(inicio) = payload.data_inicio {
            record.dados.data_inicio = Some(inicio);
        }

        if let Some(fim) = payload.data_fim {
            record.dados.data_fim = Some(fim);
        } else if record.dados.data_fim.is_none() {
            record.dados.data_fim = calcular_data_fim(record.dados.data_inicio, &cursos);
        }

        self.repo.update_turma(&record)?;
        info!(id, "turma atualizada");
        self.montar(record)
    }

    pub fn excluir(&self, id: i64) -> ServiceResult<()> {
        self.buscar(id, "Turma não encontrada para exclusão")?;
        self.repo.delete_turma(id)?;
        info!(id, "turma excluída");
        Ok(())
    }

    pub fn adicionar_curso(&self, id_turma: i64, id_curso: i64) -> ServiceResult<Turma> {
        let (mut record, curso) = self.turma_e_curso(id_turma, id_curso)?;
        record.dados.curso_ids.push(curso.id);
        self.recalcular_e_salvar(record)
    }

    /// Remove a primeira ocorrência do curso na turma.
    pub fn remover_curso(&self, id_turma: i64, id_curso: i64) -> ServiceResult<Turma> {
        let (mut record, curso) = self.turma_e_curso(id_turma, id_curso)?;
        if let Some(posicao) = record.dados.curso_ids.iter().position(|id| *id == curso.id) {
            record.dados.curso_ids.remove(posicao);
        } else {
            debug!(id_turma, id_curso, "curso não pertence à turma");
        }
        self.recalcular_e_salvar(record)
    }

    fn recalcular_e_salvar(&self, mut record: TurmaRecord) -> ServiceResult<Turma> {
        let cursos = self.cursos_da_turma(&record)?;
        if let Some(fim) = calcular_data_fim(record.dados.data_inicio, &cursos) {
            record.dados.data_fim = Some(fim);
        }
        self.repo.update_turma(&record)?;
        info!(id = record.id, cursos = cursos.len(), "cursos da turma alterados");
        self.montar(record)
    }

    fn turma_e_curso(&self, id_turma: i64, id_curso: i64) -> ServiceResult<(TurmaRecord, Curso)> {
        match (self.repo.get_turma(id_turma)?, self.repo.get_curso(id_curso)?) {
            (Some(turma), Some(curso)) => Ok((turma, curso)),
            _ => Err(ServiceError::NaoEncontrado(
                "Turma ou curso não encontrado".to_string(),
            )),
        }
    }

    fn buscar(&self, id: i64, mensagem: &str) -> ServiceResult<TurmaRecord> {
        self.repo
            .get_turma(id)?
            .ok_or_else(|| ServiceError::NaoEncontrado(mensagem.to_string()))
    }

    fn cursos_da_turma(&self, record: &TurmaRecord) -> ServiceResult<Vec<Curso>> {
        let mut cursos = Vec::with_capacity(record.dados.curso_ids.len());
        for id in &record.dados.curso_ids {
            if let Some(curso) = self.repo.get_curso(*id)? {
                cursos.push(curso);
            }
        }
        Ok(cursos)
    }

    fn montar(&self, record: TurmaRecord) -> ServiceResult<Turma> {
        let cursos = self.cursos_da_turma(&record)?;
        let quantidade_alunos = self.repo.count_alunos_in_turma(record.id)?;
        Ok(Turma {
            id: record.id,
            turno: record.dados.turno,
            cursos,
            data_inicio: record.dados.data_inicio,
            data_fim: record.dados.data_fim,
            quantidade_alunos,
        })
    }
}

fn turno_obrigatorio(turno: Option<String>) -> ServiceResult<String> {
    match turno {
        Some(turno) if !turno.trim().is_empty() => Ok(turno),
        _ => Err(ServiceError::Invalido("Turno é obrigatório".to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::model::{AlunoDados, CursoRef};
    use crate::backend::repository::InMemoryRepository;

    fn data(ano: i32, mes: u32, dia: u32) -> Option<NaiveDate> {
        NaiveDate::from_ymd_opt(ano, mes, dia)
    }

    fn service() -> (Arc<InMemoryRepository>, TurmaService) {
        let repo = Arc::new(InMemoryRepository::new());
        let cursos = CursoService::new(repo.clone());
        cursos.cadastrar_iniciais().unwrap();
        let service = TurmaService::new(repo.clone(), cursos);
        (repo, service)
    }

    fn payload(turno: &str, cursos: Vec<CursoRef>, inicio: Option<NaiveDate>) -> TurmaPayload {
        TurmaPayload {
            turno: Some(turno.to_string()),
            cursos: Some(cursos),
            data_inicio: inicio,
            data_fim: None,
        }
    }

    fn curso(id: i64, carga_horaria: u32) -> Curso {
        Curso {
            id,
            nome: format!("curso {id}"),
            carga_horaria,
        }
    }

    #[test]
    fn test_calcular_data_fim() {
        let inicio = data(2025, 3, 1);
        // 120 + 90 = 210 horas -> 26 dias (divisão inteira)
        assert_eq!(
            calcular_data_fim(inicio, &[curso(1, 120), curso(2, 90)]),
            data(2025, 3, 27)
        );
        assert_eq!(calcular_data_fim(inicio, &[curso(1, 7)]), inicio);
        assert_eq!(calcular_data_fim(inicio, &[]), None);
        assert_eq!(calcular_data_fim(None, &[curso(1, 80)]), None);
    }

    #[test]
    fn test_salvar_calcula_data_fim() {
        let (_, service) = service();
        let turma = service
            .salvar(payload(
                "Noturno",
                vec![CursoRef::por_nome("excel avançado"), CursoRef::por_id(4)],
                data(2025, 2, 1),
            ))
            .unwrap();

        // 90 + 80 = 170 horas -> 21 dias
        assert_eq!(turma.data_fim, data(2025, 2, 22));
        assert_eq!(turma.cursos.len(), 2);
        assert_eq!(turma.quantidade_alunos, 0);
        assert_eq!(service.consultar(turma.id).unwrap(), turma);
    }

    #[test]
    fn test_salvar_respeita_data_fim_informada() {
        let (_, service) = service();
        let mut dados = payload("Matutino", vec![CursoRef::por_id(1)], data(2025, 2, 1));
        dados.data_fim = data(2025, 12, 31);

        let turma = service.salvar(dados).unwrap();
        assert_eq!(turma.data_fim, data(2025, 12, 31));
    }

    #[test]
    fn test_salvar_sem_turno_ou_com_curso_inexistente() {
        let (repo, service) = service();
        let err = service.salvar(payload(" ", vec![], None)).unwrap_err();
        assert!(matches!(err, ServiceError::Invalido(_)));

        let err = service
            .salvar(payload("Vespertino", vec![CursoRef::por_nome("Astronomia")], None))
            .unwrap_err();
        assert!(matches!(err, ServiceError::CursoNaoEncontrado { .. }));
        assert!(repo.list_turmas().unwrap().is_empty());
    }

    #[test]
    fn test_editar_nao_recalcula_data_fim_existente() {
        let (_, service) = service();
        let turma = service
            .salvar(payload("Noturno", vec![CursoRef::por_id(5)], data(2025, 4, 1)))
            .unwrap();
        // 60 horas -> 7 dias
        assert_eq!(turma.data_fim, data(2025, 4, 8));

        let editada = service
            .editar(
                turma.id,
                payload("Matutino", vec![CursoRef::por_id(1)], None),
            )
            .unwrap();
        assert_eq!(editada.turno.as_deref(), Some("Matutino"));
        assert_eq!(editada.cursos[0].id, 1);
        assert_eq!(editada.data_inicio, data(2025, 4, 1));
        assert_eq!(editada.data_fim, data(2025, 4, 8));
    }

    #[test]
    fn test_editar_calcula_quando_nao_ha_data_fim() {
        let (_, service) = service();
        let turma = service
            .salvar(payload("Noturno", vec![CursoRef::por_id(2)], None))
            .unwrap();
        assert_eq!(turma.data_fim, None);

        let editada = service
            .editar(
                turma.id,
                TurmaPayload {
                    turno: Some("Noturno".to_string()),
                    cursos: None,
                    data_inicio: data(2025, 5, 5),
                    data_fim: None,
                },
            )
            .unwrap();
        // cursos mantidos (90 horas -> 11 dias)
        assert_eq!(editada.cursos.len(), 1);
        assert_eq!(editada.data_fim, data(2025, 5, 16));
    }

    #[test]
    fn test_editar_substitui_data_fim_informada() {
        let (_, service) = service();
        let turma = service
            .salvar(payload("Noturno", vec![CursoRef::por_id(5)], data(2025, 4, 1)))
            .unwrap();
        assert_eq!(turma.data_fim, data(2025, 4, 8));

        let editada = service
            .editar(
                turma.id,
                TurmaPayload {
                    turno: Some("Noturno".to_string()),
                    data_fim: data(2025, 12, 31),
                    ..Default::default()
                },
            )
            .unwrap();
        assert_eq!(editada.data_fim, data(2025, 12, 31));
        assert_eq!(editada.cursos.len(), 1);
        assert_eq!(service.consultar(turma.id).unwrap().data_fim, data(2025, 12, 31));
    }

    #[test]
    fn test_editar_com_curso_inexistente_preserva_turma() {
        let (_, service) = service();
        let turma = service
            .salvar(payload("Noturno", vec![CursoRef::por_id(3)], data(2025, 6, 2)))
            .unwrap();

        let err = service
            .editar(
                turma.id,
                payload("Matutino", vec![CursoRef::por_nome("Inexistente")], data(2025, 7, 1)),
            )
            .unwrap_err();
        assert!(matches!(err, ServiceError::CursoNaoEncontrado { .. }));

        let atual = service.consultar(turma.id).unwrap();
        assert_eq!(atual, turma);
        assert_eq!(atual.turno.as_deref(), Some("Noturno"));
        assert_eq!(atual.data_inicio, data(2025, 6, 2));
    }

    #[test]
    fn test_editar_inexistente_e_turno_vazio() {
        let (_, service) = service();
        let err = service
            .editar(77, payload("Noturno", vec![], None))
            .unwrap_err();
        assert!(matches!(err, ServiceError::NaoEncontrado(_)));

        let turma = service.salvar(payload("Noturno", vec![], None)).unwrap();
        let err = service
            .editar(
                turma.id,
                TurmaPayload {
                    turno: None,
                    ..Default::default()
                },
            )
            .unwrap_err();
        assert!(matches!(err, ServiceError::Invalido(_)));
    }

    #[test]
    fn test_adicionar_e_remover_curso() {
        let (_, service) = service();
        let turma = service
            .salvar(payload("Noturno", vec![CursoRef::por_id(4)], data(2025, 1, 1)))
            .unwrap();
        // 80 horas -> 10 dias
        assert_eq!(turma.data_fim, data(2025, 1, 11));

        let turma = service.adicionar_curso(turma.id, 1).unwrap();
        // 80 + 120 = 200 horas -> 25 dias
        assert_eq!(turma.data_fim, data(2025, 1, 26));
        assert_eq!(turma.cursos.len(), 2);

        let turma = service.remover_curso(turma.id, 4).unwrap();
        assert_eq!(turma.cursos.iter().map(|c| c.id).collect::<Vec<_>>(), [1_i64]);
        // 120 horas -> 15 dias
        assert_eq!(turma.data_fim, data(2025, 1, 16));

        // sem cursos a data de término é mantida
        let turma = service.remover_curso(turma.id, 1).unwrap();
        assert!(turma.cursos.is_empty());
        assert_eq!(turma.data_fim, data(2025, 1, 16));

        let err = service.adicionar_curso(turma.id, 999).unwrap_err();
        assert_eq!(err.to_string(), "Turma ou curso não encontrado");
        assert!(service.remover_curso(999, 1).is_err());
    }

    #[test]
    fn test_excluir_e_contagem_de_alunos() {
        let (repo, service) = service();
        let turma = service.salvar(payload("Noturno", vec![], None)).unwrap();
        repo.insert_aluno(AlunoDados {
            nome: "Carla".to_string(),
            turma_id: Some(turma.id),
            ..Default::default()
        })
        .unwrap();

        assert_eq!(service.listar().unwrap()[0].quantidade_alunos, 1);

        service.excluir(turma.id).unwrap();
        assert!(matches!(
            service.excluir(turma.id),
            Err(ServiceError::NaoEncontrado(_))
        ));
        assert!(service.listar().unwrap().is_empty());
    }
}
