//! Agent Roster
//!
//! A single handle type covering every agent kind, so one match can mix
//! in-process bots with child processes.

use crate::game::entity::PlayerId;
use crate::game::moves::Move;
use crate::game::world::World;
use crate::network::bots::BotAgent;
use crate::network::pipe::PipeAgent;
use crate::network::transport::{AgentHandle, TransportError};

pub enum Agent {
    Bot(BotAgent),
    Pipe(PipeAgent),
}

impl From<BotAgent> for Agent {
    fn from(bot: BotAgent) -> Self {
        Agent::Bot(bot)
    }
}

impl From<PipeAgent> for Agent {
    fn from(pipe: PipeAgent) -> Self {
        Agent::Pipe(pipe)
    }
}

impl AgentHandle for Agent {
    async fn initialize(&mut self, player: PlayerId, world: &World) -> Result<String, TransportError> {
        match self {
            Agent::Bot(bot) => bot.initialize(player, world).await,
            Agent::Pipe(pipe) => pipe.initialize(player, world).await,
        }
    }

    async fn request_commands(&mut self, turn: u32, world: &World) -> Result<Vec<Move>, TransportError> {
        match self {
            Agent::Bot(bot) => bot.request_commands(turn, world).await,
            Agent::Pipe(pipe) => pipe.request_commands(turn, world).await,
        }
    }

    fn log_filename(&self) -> Option<String> {
        match self {
            Agent::Bot(bot) => bot.log_filename(),
            Agent::Pipe(pipe) => pipe.log_filename(),
        }
    }
}
