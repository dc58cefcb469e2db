//! Variable placement with separation constraints
//!
//! One-dimensional solver: place every variable as close as possible to its
//! desired position (least squares, weighted) such that each constraint
//! `left + gap <= right` holds. Variables are grouped into blocks joined by
//! tight constraints; a block sits at the weighted mean of its members'
//! desired positions unless it contains a fixed variable, which pins it.

/// A position to solve for
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Variable {
    pub desired: f64,
    pub weight: f64,
    pub fixed: bool,
}

impl Variable {
    pub fn new(desired: f64, fixed: bool) -> Self {
        Self {
            desired,
            weight: 1.0,
            fixed,
        }
    }
}

/// `variables[left] + gap <= variables[right]`
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Constraint {
    pub left: usize,
    pub right: usize,
    pub gap: f64,
}

const TOLERANCE: f64 = 1e-9;

#[derive(Debug)]
struct Block {
    vars: Vec<usize>,
    weight: f64,
    /// Σ weight · (desired - offset)
    weighted_sum: f64,
    pinned: Option<f64>,
    position: f64,
}

impl Block {
    fn update_position(&mut self) {
        self.position = match self.pinned {
            Some(p) => p,
            None if self.weight > 0.0 => self.weighted_sum / self.weight,
            None => self.position,
        };
    }
}

struct Solver<'a> {
    variables: &'a [Variable],
    constraints: &'a [Constraint],
    blocks: Vec<Block>,
    block_of: Vec<Option<usize>>,
    offsets: Vec<f64>,
}

impl Solver<'_> {
    fn position(&self, var: usize) -> Option<f64> {
        let block = (*self.block_of.get(var)?)?;
        Some(self.blocks[block].position + self.offsets[var])
    }

    fn violation(&self, c: &Constraint) -> Option<f64> {
        let left = self.position(c.left)?;
        let right = self.position(c.right)?;
        if self.block_of[c.left] == self.block_of[c.right] {
            return None;
        }
        let both_fixed = self.variables[c.left].fixed && self.variables[c.right].fixed;
        let v = left + c.gap - right;
        (!both_fixed && v > TOLERANCE).then_some(v)
    }

    fn add(&mut self, var: usize) {
        let v = &self.variables[var];
        let mut block = Block {
            vars: vec![var],
            weight: v.weight,
            weighted_sum: v.weight * v.desired,
            pinned: v.fixed.then_some(v.desired),
            position: v.desired,
        };
        block.update_position();
        self.block_of[var] = Some(self.blocks.len());
        self.blocks.push(block);
    }

    /// Make `c` tight by moving the right block into the left block
    fn merge(&mut self, c: &Constraint) -> Option<usize> {
        let left = self.block_of[c.left]?;
        let right = self.block_of[c.right]?;
        let d = self.offsets[c.left] + c.gap - self.offsets[c.right];

        let moved = std::mem::take(&mut self.blocks[right].vars);
        for var in &moved {
            self.offsets[*var] += d;
            self.block_of[*var] = Some(left);
        }
        let r = &self.blocks[right];
        let (weight, weighted_sum, pinned) = (r.weight, r.weighted_sum, r.pinned);

        let l = &mut self.blocks[left];
        l.vars.extend(moved);
        l.weight += weight;
        l.weighted_sum += weighted_sum - weight * d;
        match (l.pinned, pinned) {
            (Some(a), Some(b)) if (a - (b - d)).abs() > TOLERANCE => {
                log::warn!("conflicting fixed positions {} and {}", a, b - d);
            }
            (None, Some(b)) => l.pinned = Some(b - d),
            _ => {}
        }
        l.update_position();
        Some(left)
    }

    fn most_violated(&self, candidates: impl Iterator<Item = usize>) -> Option<usize> {
        let mut worst: Option<(usize, f64)> = None;
        for ci in candidates {
            if let Some(v) = self.violation(&self.constraints[ci]) {
                if worst.map(|(_, w)| v > w).unwrap_or(true) {
                    worst = Some((ci, v));
                }
            }
        }
        worst.map(|(ci, _)| ci)
    }
}

/// Solve for final positions of `variables`
pub fn solve(variables: &[Variable], constraints: &[Constraint]) -> Vec<f64> {
    let n = variables.len();
    let mut solver = Solver {
        variables,
        constraints,
        blocks: Vec::with_capacity(n),
        block_of: vec![None; n],
        offsets: vec![0.0; n],
    };

    let mut incoming: Vec<Vec<usize>> = vec![Vec::new(); n];
    for (ci, c) in constraints.iter().enumerate() {
        if c.left < n && c.right < n {
            incoming[c.right].push(ci);
        }
    }

    let mut order: Vec<usize> = (0..n).collect();
    order.sort_by(|a, b| variables[*a].desired.total_cmp(&variables[*b].desired).then(a.cmp(b)));

    for var in order {
        solver.add(var);
        loop {
            let Some(block) = solver.block_of[var] else { break };
            let candidates: Vec<usize> = solver.blocks[block]
                .vars
                .iter()
                .flat_map(|v| incoming[*v].iter().copied())
                .collect();
            let Some(ci) = solver.most_violated(candidates.into_iter()) else {
                break;
            };
            if solver.merge(&constraints[ci]).is_none() {
                break;
            }
        }
    }

    // Moving a merged block can break constraints between blocks that were
    // already placed. Each merge removes a block, so this terminates.
    while let Some(ci) = solver.most_violated(0..constraints.len()) {
        if solver.merge(&constraints[ci]).is_none() {
            break;
        }
    }

    (0..n)
        .map(|v| solver.position(v).unwrap_or(variables[v].desired))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn free(x: f64) -> Variable {
        Variable::new(x, false)
    }

    #[test]
    fn test_satisfied_constraints_leave_positions() {
        let out = solve(&[free(0.0), free(20.0)], &[Constraint { left: 0, right: 1, gap: 10.0 }]);
        assert_eq!(out, vec![0.0, 20.0]);
    }

    #[test]
    fn test_overlap_splits_evenly() {
        let out = solve(&[free(0.0), free(4.0)], &[Constraint { left: 0, right: 1, gap: 10.0 }]);
        assert!((out[0] - -3.0).abs() < 1e-9);
        assert!((out[1] - 7.0).abs() < 1e-9);
    }

    #[test]
    fn test_fixed_variable_does_not_move() {
        let vars = [Variable::new(0.0, true), free(4.0), free(6.0)];
        let cs = [
            Constraint { left: 0, right: 1, gap: 10.0 },
            Constraint { left: 1, right: 2, gap: 10.0 },
        ];
        let out = solve(&vars, &cs);
        assert_eq!(out[0], 0.0);
        assert!((out[1] - 10.0).abs() < 1e-9);
        assert!((out[2] - 20.0).abs() < 1e-9);
    }

    #[test]
    fn test_chain_of_three() {
        let cs = [
            Constraint { left: 0, right: 1, gap: 10.0 },
            Constraint { left: 1, right: 2, gap: 10.0 },
        ];
        let out = solve(&[free(0.0), free(1.0), free(2.0)], &cs);
        assert!((out[1] - out[0] - 10.0).abs() < 1e-9);
        assert!((out[2] - out[1] - 10.0).abs() < 1e-9);
        // mean is preserved
        assert!((out.iter().sum::<f64>() - 3.0).abs() < 1e-9);
    }
}
