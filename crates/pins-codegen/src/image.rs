//! Generated program image: code segment, data segment, per-node
//! instruction lists and a printable listing.

use std::collections::HashMap;

use pins_types::ast::NodeId;
use pins_types::instr::{segment_size, CodeInstr, DataInstr, Instruction};
use pins_types::Span;
use serde::{Deserialize, Serialize};

use crate::source_map::SourceMap;

/// Output of code generation, ready to be loaded by the machine.
#[derive(Debug, Clone)]
pub struct Image {
    /// Code segment, loaded from address 0.
    pub code: Vec<CodeInstr>,
    /// Data segment, loaded right after the code.
    pub data: Vec<DataInstr>,
    pub(crate) node_code: HashMap<NodeId, Vec<CodeInstr>>,
    pub(crate) node_data: HashMap<NodeId, Vec<DataInstr>>,
    pub source_map: SourceMap,
}

/// One line of the program listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListingLine {
    pub address: i32,
    pub size: i32,
    pub instr: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub span: Option<Span>,
}

impl Image {
    /// Instructions generated for one AST node (functions, statements,
    /// expressions, variable initialisation).
    pub fn code_of(&self, id: NodeId) -> Option<&[CodeInstr]> {
        self.node_code.get(&id).map(Vec::as_slice)
    }

    /// Data generated for one AST node (string constants, initializers).
    pub fn data_of(&self, id: NodeId) -> Option<&[DataInstr]> {
        self.node_data.get(&id).map(Vec::as_slice)
    }

    pub fn code_size(&self) -> i32 {
        segment_size(&self.code)
    }

    pub fn data_size(&self) -> i32 {
        segment_size(&self.data)
    }

    /// Every instruction of both segments with its address.
    pub fn listing(&self) -> Vec<ListingLine> {
        let mut lines = Vec::with_capacity(self.code.len() + self.data.len());
        let mut address = 0;
        for instr in &self.code {
            lines.push(line(address, instr));
            address += instr.size();
        }
        for instr in &self.data {
            lines.push(line(address, instr));
            address += instr.size();
        }
        lines
    }

    /// The listing as text, one instruction per line.
    pub fn listing_text(&self) -> String {
        self.listing()
            .iter()
            .map(|line| match line.span {
                Some(span) => format!("{:6}: {:<24} # {}\n", line.address, line.instr, span),
                None => format!("{:6}: {}\n", line.address, line.instr),
            })
            .collect()
    }
}

fn line<I: Instruction + std::fmt::Display>(address: i32, instr: &I) -> ListingLine {
    ListingLine {
        address,
        size: instr.size(),
        instr: instr.to_string(),
        span: instr.loc(),
    }
}
