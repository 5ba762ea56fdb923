//! 动画片段 - 一组变换轨道，按时间采样整副姿势

use super::track::wrap_time;
use super::transform_track::TransformTrack;
use crate::skeleton::Pose;

/// 动画片段
#[derive(Clone, Debug, PartialEq)]
pub struct Clip {
    name: String,
    tracks: Vec<TransformTrack>,
    looping: bool,
    /// 缓存的时间范围，由 `recalculate_duration` 维护
    start_time: f32,
    end_time: f32,
}

impl Default for Clip {
    fn default() -> Self {
        Self::new("No name given")
    }
}

impl Clip {
    /// 空片段，默认循环
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            tracks: Vec::new(),
            looping: true,
            start_time: 0.0,
            end_time: 0.0,
        }
    }

    pub fn from_tracks(name: impl Into<String>, tracks: Vec<TransformTrack>, looping: bool) -> Self {
        let mut clip = Self {
            name: name.into(),
            tracks,
            looping,
            start_time: 0.0,
            end_time: 0.0,
        };
        clip.recalculate_duration();
        clip
    }

    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn set_name(&mut self, name: impl Into<String>) {
        self.name = name.into();
    }

    #[inline]
    pub fn is_looping(&self) -> bool {
        self.looping
    }

    #[inline]
    pub fn set_looping(&mut self, looping: bool) {
        self.looping = looping;
    }

    #[inline]
    pub fn tracks(&self) -> &[TransformTrack] {
        &self.tracks
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.tracks.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.tracks.is_empty()
    }

    /// 查找驱动 `joint` 的轨道
    pub fn track(&self, joint: usize) -> Option<&TransformTrack> {
        self.tracks.iter().find(|t| t.joint_id == joint)
    }

    /// 查找驱动 `joint` 的轨道，不存在时新建
    ///
    /// 修改关键帧后需调用 `recalculate_duration`。
    pub fn track_mut(&mut self, joint: usize) -> &mut TransformTrack {
        match self.tracks.iter().position(|t| t.joint_id == joint) {
            Some(index) => &mut self.tracks[index],
            None => {
                self.tracks.push(TransformTrack::new(joint));
                let last = self.tracks.len() - 1;
                &mut self.tracks[last]
            }
        }
    }

    #[inline]
    pub fn joint_id_at(&self, index: usize) -> usize {
        self.tracks[index].joint_id
    }

    #[inline]
    pub fn set_joint_id_at(&mut self, index: usize, joint: usize) {
        self.tracks[index].joint_id = joint;
    }

    #[inline]
    pub fn start_time(&self) -> f32 {
        self.start_time
    }

    #[inline]
    pub fn end_time(&self) -> f32 {
        self.end_time
    }

    #[inline]
    pub fn duration(&self) -> f32 {
        self.end_time - self.start_time
    }

    /// 用有效轨道重新计算时间范围
    pub fn recalculate_duration(&mut self) {
        let mut range: Option<(f32, f32)> = None;
        for track in self.tracks.iter().filter(|t| t.is_valid()) {
            let (start, end) = (track.start_time(), track.end_time());
            range = Some(match range {
                Some((s, e)) => (s.min(start), e.max(end)),
                None => (start, end),
            });
        }

        let (start, end) = range.unwrap_or((0.0, 0.0));
        self.start_time = start;
        self.end_time = end;
    }

    /// 把时间映射到片段范围内：循环折回，非循环钳制
    pub fn adjust_time_to_fit_range(&self, time: f32) -> f32 {
        if self.looping {
            let duration = self.duration();
            if duration <= 0.0 {
                return 0.0;
            }
            wrap_time(time, self.start_time, duration)
        } else {
            time.clamp(self.start_time, self.end_time)
        }
    }

    /// 在 `time` 采样，写入 `pose` 的本地变换
    ///
    /// 返回调整后的时间；时长为 0 时不修改姿势并返回 0。
    pub fn sample(&self, pose: &mut Pose, time: f32) -> f32 {
        if self.duration() == 0.0 {
            return 0.0;
        }
        let time = self.adjust_time_to_fit_range(time);

        for track in &self.tracks {
            let joint = track.joint_id;
            if joint >= pose.len() {
                log::warn!(
                    "[Clip] '{}' 的轨道指向关节 {}，姿势只有 {} 个关节，跳过",
                    self.name,
                    joint,
                    pose.len()
                );
                continue;
            }
            let local = pose.local_transform(joint);
            let animated = track.sample(&local, time, self.looping);
            pose.set_local_transform(joint, animated);
        }

        time
    }
}
