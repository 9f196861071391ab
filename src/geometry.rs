//! 2Dベクトル・角度・回転の純粋関数群
//!
//! 座標は正規化画像座標（yは下向きが正）。ゼロ除算になりうる箇所は
//! すべて [`EPSILON`] でガードし、NaN/Infを返さない。

use nalgebra::Vector2;

pub type Vec2 = Vector2<f32>;

/// ゼロ長・平行判定の閾値
pub const EPSILON: f32 = 1e-6;

pub fn vec2(x: f32, y: f32) -> Vec2 {
    Vec2::new(x, y)
}

/// 頂点 `b` における `b→a` と `b→c` のなす角（度、0〜180）
///
/// atan2(cross, dot) で求めるため acos のような定義域外の問題がない。
/// どちらかの辺がゼロ長の場合は 0 を返す。
pub fn angle_degrees(a: Vec2, b: Vec2, c: Vec2) -> f32 {
    let ba = a - b;
    let bc = c - b;
    if ba.norm() < EPSILON || bc.norm() < EPSILON {
        return 0.0;
    }
    let cross = ba.perp(&bc);
    let dot = ba.dot(&bc);
    cross.atan2(dot).abs().to_degrees()
}

/// 角度（度）から回転行列の成分 (cos, sin) を返す
pub fn rotation_components(angle_degrees: f32) -> (f32, f32) {
    let (sin, cos) = angle_degrees.to_radians().sin_cos();
    (cos, sin)
}

/// `pivot` を中心に `point` を回転
pub fn rotate_about(point: Vec2, pivot: Vec2, (cos, sin): (f32, f32)) -> Vec2 {
    let d = point - pivot;
    vec2(
        d.x * cos - d.y * sin + pivot.x,
        d.x * sin + d.y * cos + pivot.y,
    )
}

pub fn lerp(a: Vec2, b: Vec2, t: f32) -> Vec2 {
    a + (b - a) * t
}

/// 平均ベクトル。空ならNone
pub fn mean<I: IntoIterator<Item = Vec2>>(vectors: I) -> Option<Vec2> {
    let mut sum = Vec2::zeros();
    let mut count = 0usize;
    for v in vectors {
        sum += v;
        count += 1;
    }
    if count == 0 {
        None
    } else {
        Some(sum / count as f32)
    }
}

/// 長さを `max` 以下に制限（向きは保持）
pub fn clamp_norm(v: Vec2, max: f32) -> Vec2 {
    let n = v.norm();
    if n > max && n > EPSILON {
        v * (max / n)
    } else {
        v
    }
}

/// 角度を (-180, 180] に正規化
pub fn wrap_degrees(angle: f32) -> f32 {
    let mut a = angle % 360.0;
    if a > 180.0 {
        a -= 360.0;
    } else if a <= -180.0 {
        a += 360.0;
    }
    a
}

/// 線分 p1-p2 と q1-q2 の交差判定（パラメトリック）
/// 平行・縮退した線分は交差なしとして扱う
pub fn segments_intersect(p1: Vec2, p2: Vec2, q1: Vec2, q2: Vec2) -> bool {
    let r = p2 - p1;
    let s = q2 - q1;
    let denom = r.perp(&s);
    if denom.abs() < EPSILON {
        return false;
    }
    let qp = q1 - p1;
    let t = qp.perp(&s) / denom;
    let u = qp.perp(&r) / denom;
    (0.0..=1.0).contains(&t) && (0.0..=1.0).contains(&u)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx_eq(a: f32, b: f32, eps: f32) -> bool {
        (a - b).abs() < eps
    }

    #[test]
    fn test_right_angle() {
        let angle = angle_degrees(vec2(1.0, 0.0), vec2(0.0, 0.0), vec2(0.0, 1.0));
        assert!(approx_eq(angle, 90.0, 1e-4), "got {}", angle);
    }

    #[test]
    fn test_collinear_is_180() {
        let angle = angle_degrees(vec2(1.0, 0.0), vec2(0.0, 0.0), vec2(-1.0, 0.0));
        assert!(approx_eq(angle, 180.0, 1e-4), "got {}", angle);
    }

    #[test]
    fn test_angle_is_order_independent() {
        let a = vec2(0.3, 0.1);
        let b = vec2(0.5, 0.5);
        let c = vec2(0.9, 0.4);
        assert!(approx_eq(angle_degrees(a, b, c), angle_degrees(c, b, a), 1e-4));
    }

    #[test]
    fn test_degenerate_angle_is_zero() {
        let p = vec2(0.5, 0.5);
        assert_eq!(angle_degrees(p, p, vec2(1.0, 0.0)), 0.0);
        assert_eq!(angle_degrees(vec2(1.0, 0.0), p, p), 0.0);
    }

    #[test]
    fn test_rotation_quarter_turn() {
        let rot = rotation_components(90.0);
        let p = rotate_about(vec2(2.0, 1.0), vec2(1.0, 1.0), rot);
        assert!(approx_eq(p.x, 1.0, 1e-5));
        assert!(approx_eq(p.y, 2.0, 1e-5));
    }

    #[test]
    fn test_rotation_zero_is_identity() {
        let p = rotate_about(vec2(0.3, 0.7), vec2(0.5, 0.5), rotation_components(0.0));
        assert!(approx_eq(p.x, 0.3, 1e-6));
        assert!(approx_eq(p.y, 0.7, 1e-6));
    }

    #[test]
    fn test_mean_and_clamp() {
        assert!(mean(Vec::<Vec2>::new()).is_none());
        let m = mean([vec2(0.0, 0.0), vec2(2.0, 4.0)]).unwrap();
        assert!(approx_eq(m.x, 1.0, 1e-6) && approx_eq(m.y, 2.0, 1e-6));

        let v = clamp_norm(vec2(3.0, 4.0), 1.0);
        assert!(approx_eq(v.norm(), 1.0, 1e-6));
        assert!(approx_eq(v.x, 0.6, 1e-6));
        let small = clamp_norm(vec2(0.1, 0.0), 1.0);
        assert_eq!(small, vec2(0.1, 0.0));
    }

    #[test]
    fn test_wrap_degrees() {
        assert!(approx_eq(wrap_degrees(190.0), -170.0, 1e-4));
        assert!(approx_eq(wrap_degrees(-190.0), 170.0, 1e-4));
        assert!(approx_eq(wrap_degrees(720.0), 0.0, 1e-4));
        assert!(approx_eq(wrap_degrees(-180.0), 180.0, 1e-4));
    }

    #[test]
    fn test_segments_cross() {
        assert!(segments_intersect(
            vec2(0.0, 0.0),
            vec2(1.0, 1.0),
            vec2(0.0, 1.0),
            vec2(1.0, 0.0),
        ));
    }

    #[test]
    fn test_segments_disjoint() {
        assert!(!segments_intersect(
            vec2(0.0, 0.0),
            vec2(0.4, 0.4),
            vec2(0.6, 0.0),
            vec2(1.0, 0.5),
        ));
    }

    #[test]
    fn test_parallel_segments_do_not_intersect() {
        // 同一直線上で重なっていても平行扱い
        assert!(!segments_intersect(
            vec2(0.0, 0.0),
            vec2(1.0, 0.0),
            vec2(0.5, 0.0),
            vec2(1.5, 0.0),
        ));
        assert!(!segments_intersect(
            vec2(0.0, 0.0),
            vec2(0.0, 0.0),
            vec2(0.0, 1.0),
            vec2(1.0, 0.0),
        ));
    }

    #[test]
    fn test_lerp_midpoint() {
        let m = lerp(vec2(0.0, 0.0), vec2(1.0, -2.0), 0.5);
        assert!(approx_eq(m.x, 0.5, 1e-6) && approx_eq(m.y, -1.0, 1e-6));
    }
}
