use crate::params::named_variants;

named_variants! {
    /// Voting circuit variant. The name selects both the circom library
    /// file and the sage reference class.
    pub enum BallotType: "ballot type" {
        SingleVote => "singleVote",
        MultiVote => "multiVote",
        MultiVoteWithRules => "multiVoteWithRules",
        LineVote => "lineVote",
        PointlistBorda => "pointlistBorda",
        BordaTournamentStyle => "bordaTournamentStyle",
        MajorityJudgement => "majorityJudgement",
        Condorcet => "condorcet",
    }
}

impl BallotType {
    /// Name with the first letter upper-cased, as used in template and class names.
    pub fn pascal_name(&self) -> String {
        capitalize_first(self.name())
    }

    /// Parameter that carries the number of candidates (or ballot entries).
    pub fn candidate_param(&self) -> &'static str {
        match self {
            BallotType::SingleVote
            | BallotType::MultiVote
            | BallotType::MultiVoteWithRules
            | BallotType::LineVote
            | BallotType::BordaTournamentStyle => "nVotes",
            BallotType::PointlistBorda | BallotType::MajorityJudgement | BallotType::Condorcet => {
                "nCand"
            }
        }
    }
}

pub fn capitalize_first(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
