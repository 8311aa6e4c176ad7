use crate::domain::types::{DepotIdx, JobIdx};

/// Neighbourhood moves over per-worker job sequences.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Move {
    /// Removes the job at `from_pos` of `from` and inserts it at `to_pos` of `to`.
    /// When `from == to`, `to_pos` indexes the route after the removal.
    Relocate {
        from: DepotIdx,
        from_pos: usize,
        to: DepotIdx,
        to_pos: usize,
    },
    /// Swaps two jobs held by different workers.
    Exchange {
        first: DepotIdx,
        first_pos: usize,
        second: DepotIdx,
        second_pos: usize,
    },
    /// Reverses the segment `start..=end` of one route.
    TwoOpt {
        worker: DepotIdx,
        start: usize,
        end: usize,
    },
}

impl Move {
    /// The routes this move rewrites, with their new job sequences.
    pub fn changed_routes(&self, routes: &[Vec<JobIdx>]) -> Vec<(DepotIdx, Vec<JobIdx>)> {
        match *self {
            Move::Relocate {
                from,
                from_pos,
                to,
                to_pos,
            } => {
                let mut source = routes[from.get()].clone();
                let job = source.remove(from_pos);

                if from == to {
                    source.insert(to_pos, job);
                    vec![(from, source)]
                } else {
                    let mut target = routes[to.get()].clone();
                    target.insert(to_pos, job);
                    vec![(from, source), (to, target)]
                }
            }
            Move::Exchange {
                first,
                first_pos,
                second,
                second_pos,
            } => {
                let mut a = routes[first.get()].clone();
                let mut b = routes[second.get()].clone();
                std::mem::swap(&mut a[first_pos], &mut b[second_pos]);
                vec![(first, a), (second, b)]
            }
            Move::TwoOpt { worker, start, end } => {
                let mut route = routes[worker.get()].clone();
                route[start..=end].reverse();
                vec![(worker, route)]
            }
        }
    }
}

/// Enumerates every relocate, exchange and 2-opt move of the current solution.
pub fn generate_moves(routes: &[Vec<JobIdx>]) -> Vec<Move> {
    let mut moves = Vec::new();

    for (from, source) in routes.iter().enumerate() {
        for from_pos in 0..source.len() {
            for (to, target) in routes.iter().enumerate() {
                if from == to {
                    // positions in the route once the job has been taken out
                    for to_pos in 0..source.len() {
                        if to_pos != from_pos {
                            moves.push(Move::Relocate {
                                from: DepotIdx::new(from),
                                from_pos,
                                to: DepotIdx::new(to),
                                to_pos,
                            });
                        }
                    }
                } else {
                    for to_pos in 0..=target.len() {
                        moves.push(Move::Relocate {
                            from: DepotIdx::new(from),
                            from_pos,
                            to: DepotIdx::new(to),
                            to_pos,
                        });
                    }
                }
            }
        }
    }

    for first in 0..routes.len() {
        for second in (first + 1)..routes.len() {
            for first_pos in 0..routes[first].len() {
                for second_pos in 0..routes[second].len() {
                    moves.push(Move::Exchange {
                        first: DepotIdx::new(first),
                        first_pos,
                        second: DepotIdx::new(second),
                        second_pos,
                    });
                }
            }
        }
    }

    for (worker, route) in routes.iter().enumerate() {
        for start in 0..route.len() {
            for end in (start + 2)..route.len() {
                moves.push(Move::TwoOpt {
                    worker: DepotIdx::new(worker),
                    start,
                    end,
                });
            }
        }
    }

    moves
}

#[cfg(test)]
mod tests {
    use super::*;

    fn jobs(ids: &[usize]) -> Vec<JobIdx> {
        ids.iter().copied().map(JobIdx::new).collect()
    }

    #[test]
    fn relocate_between_routes() {
        let routes = vec![jobs(&[0, 1, 2]), jobs(&[3])];
        let mv = Move::Relocate {
            from: DepotIdx::new(0),
            from_pos: 1,
            to: DepotIdx::new(1),
            to_pos: 0,
        };

        let changed = mv.changed_routes(&routes);

        assert_eq!(
            changed,
            vec![(DepotIdx::new(0), jobs(&[0, 2])), (DepotIdx::new(1), jobs(&[1, 3]))]
        );
    }

    #[test]
    fn relocate_within_a_route() {
        let routes = vec![jobs(&[0, 1, 2, 3])];
        let mv = Move::Relocate {
            from: DepotIdx::new(0),
            from_pos: 0,
            to: DepotIdx::new(0),
            to_pos: 3,
        };

        assert_eq!(mv.changed_routes(&routes), vec![(DepotIdx::new(0), jobs(&[1, 2, 3, 0]))]);
    }

    #[test]
    fn exchange_and_two_opt() {
        let routes = vec![jobs(&[0, 1, 2, 3]), jobs(&[4, 5])];

        let exchange = Move::Exchange {
            first: DepotIdx::new(0),
            first_pos: 3,
            second: DepotIdx::new(1),
            second_pos: 0,
        };
        assert_eq!(
            exchange.changed_routes(&routes),
            vec![(DepotIdx::new(0), jobs(&[0, 1, 2, 4])), (DepotIdx::new(1), jobs(&[3, 5]))]
        );

        let two_opt = Move::TwoOpt {
            worker: DepotIdx::new(0),
            start: 0,
            end: 2,
        };
        assert_eq!(two_opt.changed_routes(&routes), vec![(DepotIdx::new(0), jobs(&[2, 1, 0, 3]))]);
    }

    #[test]
    fn generates_moves_into_empty_routes() {
        let routes = vec![jobs(&[0]), vec![]];
        let moves = generate_moves(&routes);

        assert_eq!(
            moves,
            vec![Move::Relocate {
                from: DepotIdx::new(0),
                from_pos: 0,
                to: DepotIdx::new(1),
                to_pos: 0,
            }]
        );
    }

    #[test]
    fn every_generated_move_keeps_all_jobs() {
        let routes = vec![jobs(&[0, 1, 2]), jobs(&[3, 4]), vec![]];

        for mv in generate_moves(&routes) {
            let mut candidate = routes.clone();
            for (worker, sequence) in mv.changed_routes(&routes) {
                candidate[worker.get()] = sequence;
            }
            let mut all: Vec<usize> = candidate.iter().flatten().map(|j| j.get()).collect();
            all.sort();
            assert_eq!(all, vec![0, 1, 2, 3, 4], "{mv:?}");
        }
    }
}
