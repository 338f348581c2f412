//! Interface de linha de comando do simugen baseada em clap.
//!
//! Define a struct [`Cli`] com subcomandos [`Command`] (generate, resume,
//! cancel, status, pending) e flags globais (--user, --config, --verbose).

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// simugen: geração de simulados em segundo plano, retomável.
#[derive(Debug, Parser)]
#[command(name = "simugen", version, about)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Identidade do usuário; habilita avisos de retomada e a consulta ao servidor.
    #[arg(long, global = true)]
    pub user: Option<String>,

    /// Caminho do arquivo de configuração (padrão: ./simugen.toml).
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Habilita saída detalhada (verbose).
    #[arg(long, short, global = true, default_value_t = false)]
    pub verbose: bool,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Inicia a geração de um simulado e acompanha até o fim (Ctrl-C pausa).
    Generate {
        /// Identificador do simulado no servidor.
        simulado_id: String,

        /// Título exibido durante a geração.
        #[arg(long)]
        titulo: String,

        /// Quantidade de questões a gerar.
        #[arg(long)]
        total: u32,
    },

    /// Retoma o job pausado ou interrompido. Com --remote, adota um job
    /// pendente reportado pelo servidor.
    Resume {
        /// Identificador de um job pendente no servidor.
        #[arg(long)]
        remote: Option<String>,
    },

    /// Cancela o job local (o aviso ao servidor é best effort).
    Cancel,

    /// Mostra o job local e as tarefas recentes.
    Status {
        /// Remove tarefas concluídas ou falhas do histórico.
        #[arg(long, default_value_t = false)]
        clear_finished: bool,
    },

    /// Lista jobs incompletos no servidor para o usuário (requer --user).
    Pending,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_parses_generate_subcommand() {
        let cli = Cli::parse_from([
            "simugen",
            "generate",
            "sim1",
            "--titulo",
            "Português",
            "--total",
            "10",
        ]);
        match cli.command {
            Command::Generate {
                simulado_id,
                titulo,
                total,
            } => {
                assert_eq!(simulado_id, "sim1");
                assert_eq!(titulo, "Português");
                assert_eq!(total, 10);
            }
            _ => panic!("expected Generate command"),
        }
    }

    #[test]
    fn cli_parses_global_flags() {
        let cli = Cli::parse_from([
            "simugen",
            "--user",
            "u42",
            "--config",
            "/etc/simugen.toml",
            "--verbose",
            "status",
        ]);
        assert!(cli.verbose);
        assert_eq!(cli.user.as_deref(), Some("u42"));
        assert_eq!(cli.config, Some(PathBuf::from("/etc/simugen.toml")));
        assert!(matches!(
            cli.command,
            Command::Status {
                clear_finished: false
            }
        ));
    }

    #[test]
    fn cli_parses_resume_remote() {
        let cli = Cli::parse_from(["simugen", "resume", "--remote", "sim7"]);
        match cli.command {
            Command::Resume { remote } => assert_eq!(remote.as_deref(), Some("sim7")),
            _ => panic!("expected Resume command"),
        }
    }

    #[test]
    fn cli_verify() {
        Cli::command().debug_assert();
    }
}
