//! Núcleo do backend: modelos, repositórios (SQLite e em memória) e os
//! serviços de cursos, turmas e alunos.

pub mod alunos;
pub mod cursos;
pub mod datas;
pub mod error;
pub mod model;
pub mod repository;
pub mod sqlite;
pub mod state;
pub mod turmas;
